//! Tool invocation over HTTP.
//!
//! The body of `POST /tools/{name}` is the tool input. The response body is
//! always the `{ok, traceId, data | error}` envelope; the HTTP status mirrors
//! the error code so proxies and load balancers see failures.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bazaar_core::TraceId;
use serde_json::{Value, json};

use crate::error::{ErrorCode, ToolError};
use crate::state::AppState;
use crate::tools::{ToolResponse, all_tools};

/// HTTP status for a failed tool call.
#[must_use]
pub const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ToolResponse {
    fn into_response(self) -> Response {
        let status = self
            .error
            .as_ref()
            .map_or(StatusCode::OK, |err| status_for(err.code));
        (status, Json(self)).into_response()
    }
}

/// `POST /tools/{name}`
pub async fn invoke(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ToolResponse {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(input) => input,
            Err(e) => {
                tracing::debug!(tool = %name, error = %e, "Rejected malformed body");
                return ToolResponse::failure(
                    TraceId::generate(),
                    ToolError::validation(format!("Invalid JSON body: {e}")),
                );
            }
        }
    };

    state.tools().execute(&name, input).await
}

/// `GET /tools`
pub async fn list() -> Json<Value> {
    let tools = all_tools();
    Json(json!({ "count": tools.len(), "tools": tools }))
}
