//! Provider adapters.
//!
//! Every marketplace backend implements [`ProviderAdapter`]. Operations a
//! backend cannot perform fail with [`ProviderError::Unsupported`]; the
//! default method bodies do exactly that, so a search-only backend only
//! writes `search` and `get_details`.
//!
//! Adapters are registered in a [`ProviderDirectory`] keyed by provider id.
//! Which adapter a request reaches is decided by registry configuration,
//! never by matching on a provider's identity.

pub mod catalog;
pub mod http;

pub use catalog::CatalogProvider;
pub use http::HttpCatalogProvider;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bazaar_core::{
    AddressId, CanonicalProduct, Capability, Cart, CartId, Order, OrderId, PaymentMethod,
    ProductId, ProviderId, UserId,
};
use thiserror::Error;
use tracing::info;

use crate::config::ConfigError;
use crate::mapping::{ProviderFilters, ProviderVocabulary};
use crate::registry::{BackendConfig, ProviderCapabilitySet};
use crate::tools::names;

/// Errors raised by a provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend does not offer this capability.
    #[error("provider {provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: Capability,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend rejected the request's arguments.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned an unexpected payload: {0}")]
    InvalidPayload(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ProviderError {
    /// Build the capability-not-supported error for `adapter`.
    #[must_use]
    pub fn unsupported(adapter: &(impl ProviderAdapter + ?Sized), capability: Capability) -> Self {
        Self::Unsupported {
            provider: adapter.name().to_string(),
            capability,
        }
    }
}

/// The contract every marketplace backend satisfies.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider id. Also the key the adapter is registered under.
    fn name(&self) -> &str;

    fn supports(&self, capability: Capability) -> bool;

    /// One page of matches, already in canonical shape.
    async fn search(
        &self,
        _query: Option<&str>,
        _filters: &ProviderFilters,
        _page: u32,
        _limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Search))
    }

    /// `Ok(None)` when this provider does not list the product.
    async fn get_details(
        &self,
        _product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Details))
    }

    async fn add_to_cart(
        &self,
        _user_id: &UserId,
        _product_id: &ProductId,
        _quantity: u32,
    ) -> Result<Cart, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Cart))
    }

    async fn update_cart_item(
        &self,
        _user_id: &UserId,
        _product_id: &ProductId,
        _quantity: u32,
    ) -> Result<Cart, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Cart))
    }

    async fn remove_from_cart(
        &self,
        _user_id: &UserId,
        _product_id: &ProductId,
    ) -> Result<Cart, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Cart))
    }

    async fn get_cart(&self, _user_id: &UserId) -> Result<Cart, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Cart))
    }

    async fn create_order(
        &self,
        _user_id: &UserId,
        _cart_id: &CartId,
        _address_id: AddressId,
        _payment_method: PaymentMethod,
    ) -> Result<Order, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Order))
    }

    async fn get_order_status(&self, _order_id: OrderId) -> Result<Order, ProviderError> {
        Err(ProviderError::unsupported(self, Capability::Order))
    }
}

/// Adapters keyed by provider id.
#[derive(Clone, Default)]
pub struct ProviderDirectory {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.adapters.keys().map(ProviderId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ProviderDirectory")
            .field("adapters", &ids)
            .finish()
    }
}

impl ProviderDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters
            .insert(ProviderId::new(adapter.name()), adapter);
    }

    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(id)
    }

    /// The adapter for `id` if it is registered and claims `capability`.
    #[must_use]
    pub fn capable(&self, id: &ProviderId, capability: Capability) -> Option<&Arc<dyn ProviderAdapter>> {
        self.get(id).filter(|a| a.supports(capability))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build adapters for every record that names a backend.
    ///
    /// Records without a backend are skipped; they may still appear in the
    /// registry but no request will reach them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidProviderFile` if a catalog file cannot be
    /// read or a base URL is malformed.
    pub async fn from_records(records: &[ProviderCapabilitySet]) -> Result<Self, ConfigError> {
        let mut directory = Self::new();
        for record in records {
            let Some(backend) = &record.backend else {
                continue;
            };
            let adapter: Arc<dyn ProviderAdapter> = match backend {
                BackendConfig::Catalog { catalog_file } => Arc::new(
                    load_catalog(record, catalog_file).await?,
                ),
                BackendConfig::Http { base_url } => Arc::new(
                    HttpCatalogProvider::new(record.id.clone(), base_url).map_err(|e| {
                        ConfigError::InvalidProviderFile(record.id.to_string(), e.to_string())
                    })?,
                ),
            };
            info!(provider_id = %record.id, "Registered provider adapter");
            directory.register(adapter);
        }
        Ok(directory)
    }
}

async fn load_catalog(
    record: &ProviderCapabilitySet,
    path: &Path,
) -> Result<CatalogProvider, ConfigError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        ConfigError::InvalidProviderFile(path.display().to_string(), e.to_string())
    })?;
    let products: Vec<CanonicalProduct> = serde_json::from_str(&raw).map_err(|e| {
        ConfigError::InvalidProviderFile(path.display().to_string(), e.to_string())
    })?;
    Ok(CatalogProvider::new(record.id.clone(), products)
        .with_capabilities(record.capabilities.iter().copied())
        .with_vocabulary(ProviderVocabulary::for_tool(record, names::SEARCH_PRODUCTS)))
}
