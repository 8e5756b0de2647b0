//! Tool dispatch.
//!
//! [`ToolRegistry::execute`] is the single entry point: it parses the input
//! for the named tool, runs the handler, and wraps the outcome in a
//! [`ToolResponse`] envelope carrying a fresh trace id. It never returns an
//! `Err`; every failure is an envelope with `ok: false`.

pub mod definitions;
pub mod requests;

pub use definitions::{Tool, all_tools, get_tool_by_name, names};
pub use requests::ToolCall;

use std::sync::Arc;
use std::time::Instant;

use bazaar_core::{Capability, ProviderId, TraceId};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::{CheckoutConfig, SearchConfig};
use crate::db::CheckoutStore;
use crate::error::{ErrorCode, ToolError};
use crate::providers::ProviderDirectory;
use crate::registry::CapabilityRegistry;
use crate::services::{
    CartService, CheckoutService, CompareService, DetailResolver, Federation, SearchService,
    ShippingEstimator,
};

/// Uniform result envelope: `{ok, traceId, data | error}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub ok: bool,
    pub trace_id: TraceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    #[must_use]
    pub const fn success(trace_id: TraceId, data: Value) -> Self {
        Self {
            ok: true,
            trace_id,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub const fn failure(trace_id: TraceId, error: ToolError) -> Self {
        Self {
            ok: false,
            trace_id,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderSummary<'a> {
    id: &'a ProviderId,
    name: &'a str,
    enabled: bool,
    priority: i32,
    capabilities: Vec<Capability>,
    /// Whether an adapter is registered for this record.
    connected: bool,
}

/// Every tool, its handler, and the services behind them.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    federation: Federation,
    search: SearchService,
    details: DetailResolver,
    compare: CompareService,
    cart: CartService,
    checkout: CheckoutService,
    shipping: ShippingEstimator,
}

impl ToolRegistry {
    /// Wire every service over one registry, adapter directory, and store.
    #[must_use]
    pub fn new(
        search: SearchConfig,
        checkout: CheckoutConfig,
        registry: Arc<CapabilityRegistry>,
        providers: Arc<ProviderDirectory>,
        store: Arc<dyn CheckoutStore>,
    ) -> Self {
        let federation = Federation::new(registry, providers, search.provider_timeout);
        let details = DetailResolver::new(federation.clone());
        Self {
            search: SearchService::new(federation.clone()),
            compare: CompareService::new(details.clone()),
            cart: CartService::new(federation.clone()),
            checkout: CheckoutService::new(store, federation.clone(), checkout),
            shipping: ShippingEstimator::new(checkout.pricing, checkout.currency),
            details,
            federation,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        self.federation.registry()
    }

    /// Run the tool called `name` with `input`.
    pub async fn execute(&self, name: &str, input: Value) -> ToolResponse {
        let trace_id = TraceId::generate();
        let span = info_span!("tool", tool = %name, trace_id = %trace_id);

        async move {
            let started = Instant::now();
            let outcome = self.dispatch(name, input).await;
            let duration_ms = started.elapsed().as_millis();

            match outcome {
                Ok(data) => {
                    info!(duration_ms, "Tool succeeded");
                    ToolResponse::success(trace_id, data)
                }
                Err(err) => {
                    if err.code == ErrorCode::InternalError {
                        let event_id = sentry::capture_error(&err);
                        error!(
                            error = %err,
                            sentry_event_id = %event_id,
                            duration_ms,
                            "Tool failed"
                        );
                    } else {
                        warn!(code = %err.code, message = %err.message, duration_ms, "Tool rejected");
                    }
                    ToolResponse::failure(trace_id, err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let Some(call) = ToolCall::parse(name, input)? else {
            return Err(ToolError::not_found(format!("Tool not found: {name}")));
        };

        match call {
            ToolCall::SearchProducts(req) => to_data(&self.search.search(&req).await?),
            ToolCall::GetProductDetails(req) => {
                let found = match &req.provider {
                    Some(provider) => self.details.resolve_from(provider, &req.product_id).await?,
                    None => self.details.resolve(&req.product_id).await?,
                };
                let product = found.ok_or_else(|| {
                    ToolError::not_found(format!("Product not found: {}", req.product_id))
                })?;
                to_data(&product)
            }
            ToolCall::CompareProducts(req) => {
                to_data(&self.compare.compare(&req.product_ids).await?)
            }
            ToolCall::EstimateShipping(req) => to_data(&self.shipping.estimate(
                req.product_id,
                &req.address.pincode,
                req.quantity,
                chrono::Utc::now(),
            )),
            ToolCall::AddCartItem(req) => to_data(&self.cart.add_item(&req).await?),
            ToolCall::UpdateCartItem(req) => to_data(&self.cart.update_item(&req).await?),
            ToolCall::RemoveCartItem(req) => to_data(&self.cart.remove_item(&req).await?),
            ToolCall::GetCart(req) => to_data(&self.cart.get_cart(&req.user_id).await?),
            ToolCall::CreateCheckout(req) => to_data(&self.checkout.create(&req).await?),
            ToolCall::UpdateCheckout(req) => to_data(&self.checkout.update(&req).await?),
            ToolCall::GetCheckout(req) => to_data(&self.checkout.get(&req).await?),
            ToolCall::CompleteCheckout(req) => to_data(&self.checkout.complete(&req).await?),
            ToolCall::CancelCheckout(req) => to_data(&self.checkout.cancel(&req).await?),
            ToolCall::GetOrderStatus(req) => to_data(&self.checkout.order_status(&req).await?),
            ToolCall::GetProviders => self.providers().await,
            ToolCall::GetProviderTools(req) => self.provider_tools(&req.provider_id).await,
            ToolCall::GetTools => {
                let tools = all_tools();
                Ok(json!({ "count": tools.len(), "tools": tools }))
            }
        }
    }

    async fn providers(&self) -> Result<Value, ToolError> {
        let snapshot = self.federation.snapshot().await?;
        let providers: Vec<_> = snapshot
            .providers
            .iter()
            .map(|record| ProviderSummary {
                id: &record.id,
                name: record.name(),
                enabled: record.enabled,
                priority: record.priority,
                capabilities: record.capabilities.iter().copied().collect(),
                connected: self.federation.providers().get(&record.id).is_some(),
            })
            .collect();
        Ok(json!({
            "providers": providers,
            "count": providers.len(),
            "refreshedAt": snapshot.loaded_at,
        }))
    }

    async fn provider_tools(&self, provider_id: &ProviderId) -> Result<Value, ToolError> {
        let snapshot = self.federation.snapshot().await?;
        let record = snapshot
            .get(provider_id)
            .ok_or_else(|| ToolError::not_found(format!("Provider not found: {provider_id}")))?;

        let available: Vec<String> = all_tools()
            .into_iter()
            .filter(|tool| tool.capability.is_some_and(|c| record.serves(&tool.name, c)))
            .map(|tool| tool.name)
            .collect();

        Ok(json!({
            "providerId": record.id,
            "providerName": record.name(),
            "enabled": record.enabled,
            "capabilities": record.capabilities,
            "availableTools": available,
            "toolConfigs": record.tools,
        }))
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::internal(format!("Failed to serialize response: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::MemoryCheckoutStore;
    use crate::registry::{ProviderCapabilitySet, StaticSource};

    fn tool_registry(records: Vec<ProviderCapabilitySet>) -> ToolRegistry {
        let registry = CapabilityRegistry::new(
            Arc::new(StaticSource::new(records)),
            Duration::from_secs(60),
        );
        ToolRegistry::new(
            SearchConfig::default(),
            CheckoutConfig::default(),
            Arc::new(registry),
            Arc::new(ProviderDirectory::new()),
            Arc::new(MemoryCheckoutStore::new()),
        )
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let tools = tool_registry(Vec::new());
        let response = tools.execute("commerce.teleport", json!({})).await;
        assert!(!response.ok);
        let err = response.error.unwrap();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Tool not found: commerce.teleport");
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let tools = tool_registry(Vec::new());
        let response = tools.execute(names::GET_TOOLS, Value::Null).await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json["traceId"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(json["data"]["count"], 17);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_trace_ids_differ_per_call() {
        let tools = tool_registry(Vec::new());
        let a = tools.execute(names::GET_TOOLS, Value::Null).await;
        let b = tools.execute(names::GET_TOOLS, Value::Null).await;
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[tokio::test]
    async fn test_invalid_input_is_validation_error() {
        let tools = tool_registry(Vec::new());
        let response = tools
            .execute(names::CART_ADD_ITEM, json!({"userId": "u1"}))
            .await;
        assert_eq!(response.error.unwrap().code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_providers_listed_in_priority_order() {
        let mut late = ProviderCapabilitySet::new("zeta", [Capability::Search]);
        late.priority = 5;
        let mut early = ProviderCapabilitySet::new("alpha", [Capability::Cart]);
        early.priority = 1;
        early.enabled = false;
        let tools = tool_registry(vec![late, early]);

        let data = tools
            .execute(names::GET_PROVIDERS, Value::Null)
            .await
            .data
            .unwrap();
        assert_eq!(data["count"], 2);
        assert_eq!(data["providers"][0]["id"], "alpha");
        assert_eq!(data["providers"][0]["enabled"], false);
        assert_eq!(data["providers"][0]["connected"], false);
        assert_eq!(data["providers"][1]["name"], "zeta");
    }

    #[tokio::test]
    async fn test_provider_tools_unknown_provider() {
        let tools = tool_registry(Vec::new());
        let response = tools
            .execute(names::GET_PROVIDER_TOOLS, json!({"providerId": "ghost"}))
            .await;
        let err = response.error.unwrap();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Provider not found: ghost");
    }

    #[tokio::test]
    async fn test_provider_tools_honours_overrides() {
        let mut record =
            ProviderCapabilitySet::new("acme", [Capability::Search, Capability::Details]);
        record.tools.insert(
            names::GET_PRODUCT_DETAILS.to_string(),
            serde_yaml::from_str("enabled: false").unwrap(),
        );
        let tools = tool_registry(vec![record]);

        let response = tools
            .execute(names::GET_PROVIDER_TOOLS, json!({"providerId": "acme"}))
            .await;
        let data = response.data.unwrap();
        let available: Vec<&str> = data["availableTools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(available.contains(&names::SEARCH_PRODUCTS));
        assert!(available.contains(&names::COMPARE_PRODUCTS));
        assert!(!available.contains(&names::GET_PRODUCT_DETAILS));
        assert!(!available.contains(&names::CART_ADD_ITEM));
    }
}
