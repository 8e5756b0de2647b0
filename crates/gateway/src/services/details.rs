//! Product detail lookup across providers.

use bazaar_core::{CanonicalProduct, Capability, ProductId, ProviderId};
use tracing::{debug, instrument, warn};

use super::Federation;
use crate::error::ToolError;

/// Resolves a product id to the first provider that knows it.
#[derive(Debug, Clone)]
pub struct DetailResolver {
    federation: Federation,
}

impl DetailResolver {
    #[must_use]
    pub const fn new(federation: Federation) -> Self {
        Self { federation }
    }

    /// Ask enabled DETAILS providers in priority order; the first non-null
    /// answer wins.
    ///
    /// Provider errors and timeouts are logged and the scan moves on.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL_ERROR` only if the provider records cannot be loaded.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn resolve(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ToolError> {
        let snapshot = self.federation.snapshot().await?;
        for record in snapshot.enabled_with(Capability::Details) {
            if let Some(product) = self.lookup(&record.id, product_id).await {
                return Ok(Some(product));
            }
        }
        debug!("No provider knows this product");
        Ok(None)
    }

    /// Ask one named provider only.
    ///
    /// # Errors
    ///
    /// Returns `PROVIDER_ERROR` if the provider is disabled, unknown, or
    /// lacks DETAILS. Provider failures surface with the provider attached.
    #[instrument(skip(self), fields(provider_id = %provider_id, product_id = %product_id))]
    pub async fn resolve_from(
        &self,
        provider_id: &ProviderId,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ToolError> {
        let snapshot = self.federation.snapshot().await?;
        let enabled = snapshot
            .get(provider_id)
            .is_some_and(|r| r.enabled && r.supports(Capability::Details));
        let adapter = self
            .federation
            .providers()
            .capable(provider_id, Capability::Details);
        let Some(adapter) = adapter.filter(|_| enabled) else {
            return Err(ToolError::provider(format!(
                "Provider not available: {provider_id}"
            )));
        };

        self.federation
            .bounded(adapter.get_details(product_id))
            .await
            .map_err(|e| ToolError::from_provider(provider_id, e))
    }

    async fn lookup(
        &self,
        provider_id: &ProviderId,
        product_id: &ProductId,
    ) -> Option<CanonicalProduct> {
        let adapter = self
            .federation
            .providers()
            .capable(provider_id, Capability::Details)?;
        match self.federation.bounded(adapter.get_details(product_id)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(provider_id = %provider_id, error = %e, "Provider detail lookup failed");
                None
            }
        }
    }
}
