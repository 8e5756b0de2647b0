//! Cart aggregation.
//!
//! A user has one active cart, held by one provider. `addItem` names the
//! provider explicitly; every other cart call goes through
//! [`resolve_cart_provider`], which picks the first enabled CART provider.
//! The two can disagree when more than one CART provider is enabled.

use std::sync::Arc;

use bazaar_core::{Capability, Cart, CartId, ProviderId, UserId};
use tracing::{info, instrument};

use super::Federation;
use crate::error::ToolError;
use crate::providers::{ProviderAdapter, ProviderDirectory};
use crate::registry::RegistrySnapshot;
use crate::tools::requests::{AddItemRequest, RemoveItemRequest, UpdateItemRequest};

/// The provider that owns cart calls that do not name one: the first
/// enabled provider, in registry order, advertising CART with an adapter
/// that supports it.
#[must_use]
pub fn resolve_cart_provider(
    snapshot: &RegistrySnapshot,
    providers: &ProviderDirectory,
) -> Option<(ProviderId, Arc<dyn ProviderAdapter>)> {
    snapshot.enabled_with(Capability::Cart).find_map(|record| {
        providers
            .capable(&record.id, Capability::Cart)
            .map(|adapter| (record.id.clone(), Arc::clone(adapter)))
    })
}

#[derive(Debug, Clone)]
pub struct CartService {
    federation: Federation,
}

impl CartService {
    #[must_use]
    pub const fn new(federation: Federation) -> Self {
        Self { federation }
    }

    /// Add to the cart held by the named provider. Re-adding a product
    /// increments its quantity.
    ///
    /// # Errors
    ///
    /// Returns `PROVIDER_ERROR` if the provider is unknown, disabled, or
    /// lacks CART; otherwise whatever the provider reports.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, provider_id = %request.provider))]
    pub async fn add_item(&self, request: &AddItemRequest) -> Result<Cart, ToolError> {
        let adapter = self.pinned(&request.provider).await?;
        let cart = self
            .federation
            .bounded(adapter.add_to_cart(&request.user_id, &request.product_id, request.quantity))
            .await
            .map_err(|e| ToolError::from_provider(&request.provider, e))?;
        info!(product_id = %request.product_id, quantity = request.quantity, "Item added");
        Ok(recomputed(cart))
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `PROVIDER_ERROR` if no cart provider is available, or
    /// `NOT_FOUND` if the product is not in the cart.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn update_item(&self, request: &UpdateItemRequest) -> Result<Cart, ToolError> {
        let (provider_id, adapter) = self.resolved().await?;
        let cart = self
            .federation
            .bounded(adapter.update_cart_item(&request.user_id, &request.product_id, request.quantity))
            .await
            .map_err(|e| ToolError::from_provider(&provider_id, e))?;
        info!(product_id = %request.product_id, quantity = request.quantity, "Item quantity set");
        Ok(recomputed(cart))
    }

    /// Drop a line entirely.
    ///
    /// # Errors
    ///
    /// Returns `PROVIDER_ERROR` if no cart provider is available.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn remove_item(&self, request: &RemoveItemRequest) -> Result<Cart, ToolError> {
        let (provider_id, adapter) = self.resolved().await?;
        let cart = self
            .federation
            .bounded(adapter.remove_from_cart(&request.user_id, &request.product_id))
            .await
            .map_err(|e| ToolError::from_provider(&provider_id, e))?;
        info!(product_id = %request.product_id, "Item removed");
        Ok(recomputed(cart))
    }

    /// # Errors
    ///
    /// Returns `PROVIDER_ERROR` if no cart provider is available.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Cart, ToolError> {
        let (provider_id, adapter) = self.resolved().await?;
        let cart = self
            .federation
            .bounded(adapter.get_cart(user_id))
            .await
            .map_err(|e| ToolError::from_provider(&provider_id, e))?;
        Ok(recomputed(cart))
    }

    /// Fetch the cart a checkout is being opened from.
    ///
    /// With `provider` set the cart is read there (same gating as
    /// `add_item`); otherwise from the resolved cart provider.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user's cart there has a different id, and
    /// `VALIDATION_ERROR` if it is empty.
    #[instrument(skip(self))]
    pub async fn checkout_cart(
        &self,
        user_id: &UserId,
        cart_id: &CartId,
        provider: Option<&ProviderId>,
    ) -> Result<(ProviderId, Cart), ToolError> {
        let (provider_id, adapter) = match provider {
            Some(id) => (id.clone(), self.pinned(id).await?),
            None => self.resolved().await?,
        };
        let cart = self
            .federation
            .bounded(adapter.get_cart(user_id))
            .await
            .map_err(|e| ToolError::from_provider(&provider_id, e))?;

        if &cart.id != cart_id {
            return Err(ToolError::not_found("Cart not found"));
        }
        if cart.is_empty() {
            return Err(ToolError::validation("Cart is empty"));
        }
        Ok((provider_id, recomputed(cart)))
    }

    async fn pinned(&self, provider_id: &ProviderId) -> Result<Arc<dyn ProviderAdapter>, ToolError> {
        let Some(adapter) = self
            .federation
            .providers()
            .capable(provider_id, Capability::Cart)
        else {
            return Err(ToolError::provider(format!(
                "Provider not available: {provider_id}"
            )));
        };

        let snapshot = self.federation.snapshot().await?;
        let allowed = snapshot
            .get(provider_id)
            .is_some_and(|r| r.enabled && r.supports(Capability::Cart));
        if !allowed {
            return Err(ToolError::provider(format!(
                "Provider disabled or missing CART capability: {provider_id}"
            )));
        }
        Ok(Arc::clone(adapter))
    }

    async fn resolved(&self) -> Result<(ProviderId, Arc<dyn ProviderAdapter>), ToolError> {
        let snapshot = self.federation.snapshot().await?;
        resolve_cart_provider(&snapshot, self.federation.providers())
            .ok_or_else(|| ToolError::provider("No cart provider available"))
    }
}

fn recomputed(mut cart: Cart) -> Cart {
    cart.recompute();
    cart
}
