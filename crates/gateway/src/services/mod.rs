//! Orchestrators behind the tools.
//!
//! Each service owns one slice of the tool surface. They share a
//! [`Federation`]: the capability registry, the adapter directory, and the
//! per-call provider timeout.

pub mod cart;
pub mod checkout;
pub mod compare;
pub mod details;
pub mod search;
pub mod shipping;

pub use cart::{CartService, resolve_cart_provider};
pub use checkout::{CancelledCheckout, CheckoutOutcome, CheckoutService, CheckoutView, OrderView};
pub use compare::{CompareService, Comparison, ComparisonMatrix};
pub use details::DetailResolver;
pub use search::{SearchResults, SearchService};
pub use shipping::{ShippingEstimate, ShippingEstimator};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{CurrencyCode, Money};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::providers::{ProviderDirectory, ProviderError};
use crate::registry::{CapabilityRegistry, RegistrySnapshot};

/// Registry, adapters, and the fan-out timeout, shared by every service.
#[derive(Debug, Clone)]
pub struct Federation {
    registry: Arc<CapabilityRegistry>,
    providers: Arc<ProviderDirectory>,
    provider_timeout: Duration,
}

impl Federation {
    #[must_use]
    pub const fn new(
        registry: Arc<CapabilityRegistry>,
        providers: Arc<ProviderDirectory>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            providers,
            provider_timeout,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderDirectory {
        &self.providers
    }

    /// Current provider records.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL_ERROR` if no snapshot can be loaded.
    pub async fn snapshot(&self) -> Result<Arc<RegistrySnapshot>, crate::error::ToolError> {
        Ok(self.registry.snapshot().await?)
    }

    /// Run one provider call under the per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `ProviderError::Timeout`.
    pub async fn bounded<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::time::timeout(self.provider_timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.provider_timeout))?
    }
}

/// Money as rendered in tool responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoneyView {
    pub amount: Decimal,
    pub currency: CurrencyCode,
    /// Symbol and thousands separators, e.g. `₹1,234.50`.
    pub formatted: String,
}

impl From<Money> for MoneyView {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount,
            currency: money.currency,
            formatted: money.display(),
        }
    }
}
