//! Request correlation for tool calls.
//!
//! Every HTTP request gets a request id: the upstream `x-request-id` when it
//! is short and printable, otherwise a fresh UUID v4. The id and, for
//! `/tools/{name}` calls, the tool name are recorded on the HTTP span and the
//! Sentry scope. The id is echoed back in the response headers.
//!
//! Request ids are per HTTP call. The `traceId` in a tool envelope is per
//! invocation and is minted by the dispatcher.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id kept as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

const TOOL_PATH_PREFIX: &str = "/tools/";

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| is_usable_request_id(id))
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);
    let tool = tool_name(request.uri().path()).map(str::to_string);

    let span = Span::current();
    span.record("request_id", &request_id);
    if let Some(tool) = &tool {
        span.record("tool", tool.as_str());
    }

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        if let Some(tool) = &tool {
            scope.set_tag("tool", tool);
        }
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Upstream ids end up in logs and Sentry tags, so only short ids made of
/// `[A-Za-z0-9._:-]` are trusted.
fn is_usable_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// Tool name for a `/tools/{name}` path.
fn tool_name(path: &str) -> Option<&str> {
    path.strip_prefix(TOOL_PATH_PREFIX)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}
