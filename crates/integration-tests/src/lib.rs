//! Integration test support for the Bazaar gateway.
//!
//! Provides fake provider adapters and a [`Harness`] that wires a full
//! [`ToolRegistry`] over an in-memory capability source and checkout store.
//!
//! # Fakes
//!
//! - [`ScriptedProvider`] - serves a fixed product list, windows it by the
//!   page/limit it is asked for, and records every search call
//! - [`FailingProvider`] - every call fails upstream
//! - [`SlowProvider`] - answers after a delay, to trip the per-call timeout
//!
//! Cart and checkout flows use the gateway's own `CatalogProvider`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bazaar_core::{
    Availability, CanonicalProduct, Capability, CheckoutId, CurrencyCode, Money, ProductId,
    ProviderId, UserId,
};
use bazaar_gateway::config::{CheckoutConfig, SearchConfig};
use bazaar_gateway::db::{CheckoutStore, MemoryCheckoutStore};
use bazaar_gateway::mapping::ProviderFilters;
use bazaar_gateway::providers::{ProviderAdapter, ProviderDirectory, ProviderError};
use bazaar_gateway::registry::{CapabilityRegistry, ProviderCapabilitySet, StaticSource};
use bazaar_gateway::{ToolError, ToolRegistry, ToolResponse};
use rust_decimal::Decimal;
use serde_json::Value;

// =============================================================================
// Fixtures
// =============================================================================

/// A product owned by `provider`, priced in whole rupees.
#[must_use]
pub fn product(
    provider: &str,
    id: &str,
    name: &str,
    brand: Option<&str>,
    price: i64,
    rating: Option<f64>,
) -> CanonicalProduct {
    CanonicalProduct {
        id: ProductId::new(id),
        provider_id: ProviderId::new(provider),
        name: name.to_string(),
        description: None,
        brand: brand.map(str::to_string),
        category: Some("electronics.mobiles".to_string()),
        price: Money::new(Decimal::from(price), CurrencyCode::INR),
        image_url: None,
        availability: Availability::default(),
        rating,
        review_count: None,
        attributes: BTreeMap::new(),
    }
}

/// Read a `{amount, ...}` money view (or a bare decimal string) as a `Decimal`.
///
/// # Panics
///
/// Panics if the value is not a decimal.
#[must_use]
pub fn amount(value: &Value) -> Decimal {
    let raw = value.get("amount").unwrap_or(value);
    match raw {
        Value::String(s) => Decimal::from_str(s).unwrap_or_else(|e| panic!("bad decimal {s}: {e}")),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .unwrap_or_else(|e| panic!("bad decimal {n}: {e}")),
        other => panic!("expected a decimal, got {other}"),
    }
}

/// A delivery address accepted by checkout.
#[must_use]
pub fn address_json(pincode: &str) -> Value {
    serde_json::json!({
        "name": "Asha Rao",
        "line1": "14 MG Road",
        "city": "Bengaluru",
        "state": "KA",
        "pincode": pincode
    })
}

// =============================================================================
// Fake Providers
// =============================================================================

/// One recorded `search` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: Option<String>,
    pub filters: ProviderFilters,
    pub page: u32,
    pub limit: u32,
}

/// Serves a fixed product list with server-side paging, and records calls.
#[derive(Debug)]
pub struct ScriptedProvider {
    id: String,
    products: Vec<CanonicalProduct>,
    calls: Mutex<Vec<SearchCall>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(id: &str, products: Vec<CanonicalProduct>) -> Self {
        Self {
            id: id.to_string(),
            products,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every search call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::Search | Capability::Details)
    }

    async fn search(
        &self,
        query: Option<&str>,
        filters: &ProviderFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SearchCall {
                query: query.map(str::to_string),
                filters: filters.clone(),
                page,
                limit,
            });
        let skip = page.saturating_sub(1) as usize * limit as usize;
        Ok(self
            .products
            .iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_details(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        Ok(self.products.iter().find(|p| &p.id == product_id).cloned())
    }
}

/// Fails every search and detail lookup.
#[derive(Debug)]
pub struct FailingProvider {
    id: String,
}

impl FailingProvider {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[async_trait]
impl ProviderAdapter for FailingProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::Search | Capability::Details)
    }

    async fn search(
        &self,
        _query: Option<&str>,
        _filters: &ProviderFilters,
        _page: u32,
        _limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        Err(ProviderError::Upstream(format!("{} is down", self.id)))
    }

    async fn get_details(
        &self,
        _product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        Err(ProviderError::Upstream(format!("{} is down", self.id)))
    }
}

/// Answers correctly, but only after `delay`.
#[derive(Debug)]
pub struct SlowProvider {
    inner: ScriptedProvider,
    delay: Duration,
}

impl SlowProvider {
    #[must_use]
    pub fn new(id: &str, products: Vec<CanonicalProduct>, delay: Duration) -> Self {
        Self {
            inner: ScriptedProvider::new(id, products),
            delay,
        }
    }
}

#[async_trait]
impl ProviderAdapter for SlowProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports(&self, capability: Capability) -> bool {
        self.inner.supports(capability)
    }

    async fn search(
        &self,
        query: Option<&str>,
        filters: &ProviderFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.search(query, filters, page, limit).await
    }

    async fn get_details(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_details(product_id).await
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Builds a [`Harness`] from provider records and adapters.
#[derive(Debug)]
pub struct HarnessBuilder {
    records: Vec<ProviderCapabilitySet>,
    providers: ProviderDirectory,
    search: SearchConfig,
    checkout: CheckoutConfig,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            providers: ProviderDirectory::new(),
            search: SearchConfig {
                provider_timeout: Duration::from_millis(500),
            },
            checkout: CheckoutConfig::default(),
        }
    }
}

impl HarnessBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record together with the adapter serving it.
    #[must_use]
    pub fn provider(mut self, record: ProviderCapabilitySet, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.records.push(record);
        self.providers.register(adapter);
        self
    }

    /// Register a record with no adapter behind it.
    #[must_use]
    pub fn record(mut self, record: ProviderCapabilitySet) -> Self {
        self.records.push(record);
        self
    }

    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.search.provider_timeout = timeout;
        self
    }

    #[must_use]
    pub fn build(self) -> Harness {
        let source = Arc::new(StaticSource::new(self.records));
        let registry = Arc::new(CapabilityRegistry::new(
            source.clone(),
            Duration::from_secs(60),
        ));
        let store = Arc::new(MemoryCheckoutStore::new());
        let tools = ToolRegistry::new(
            self.search,
            self.checkout,
            registry.clone(),
            Arc::new(self.providers),
            store.clone(),
        );
        Harness {
            tools,
            store,
            source,
            registry,
        }
    }
}

/// A wired gateway plus handles on its in-memory parts.
#[derive(Debug)]
pub struct Harness {
    pub tools: ToolRegistry,
    pub store: Arc<MemoryCheckoutStore>,
    pub source: Arc<StaticSource>,
    pub registry: Arc<CapabilityRegistry>,
}

impl Harness {
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    pub async fn call(&self, tool: &str, input: Value) -> ToolResponse {
        self.tools.execute(tool, input).await
    }

    /// Call a tool that must succeed and return its `data`.
    ///
    /// # Panics
    ///
    /// Panics with the error body if the call failed.
    pub async fn ok(&self, tool: &str, input: Value) -> Value {
        let response = self.call(tool, input).await;
        match (response.ok, response.data) {
            (true, Some(data)) => data,
            _ => panic!("{tool} failed: {:?}", response.error),
        }
    }

    /// Call a tool that must fail and return its error.
    ///
    /// # Panics
    ///
    /// Panics if the call succeeded.
    pub async fn err(&self, tool: &str, input: Value) -> ToolError {
        let response = self.call(tool, input).await;
        match response.error {
            Some(error) if !response.ok => error,
            _ => panic!("{tool} unexpectedly succeeded: {:?}", response.data),
        }
    }

    /// Swap the provider records and force the registry to reload them.
    ///
    /// # Panics
    ///
    /// Panics if the reload fails.
    pub async fn replace_records(&self, records: Vec<ProviderCapabilitySet>) {
        self.source.replace(records).await;
        if let Err(e) = self.registry.refresh().await {
            panic!("registry refresh failed: {e}");
        }
    }

    /// Move a session's expiry into the past without touching its status.
    ///
    /// # Panics
    ///
    /// Panics if the session does not exist or the write is rejected.
    pub async fn backdate_checkout(&self, checkout_id: CheckoutId, user_id: &UserId) {
        let session = self
            .store
            .get_session(checkout_id, user_id)
            .await
            .unwrap_or_else(|e| panic!("load failed: {e}"));
        let Some(mut session) = session else {
            panic!("checkout {checkout_id} not found");
        };
        let now = chrono::Utc::now();
        session.expires_at = now - chrono::Duration::minutes(1);
        let expected = session.next_revision(now);
        let written = self
            .store
            .update_session(&session, expected)
            .await
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        assert!(written, "backdating checkout {checkout_id} lost a race");
    }
}
