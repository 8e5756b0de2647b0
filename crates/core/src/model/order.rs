//! Orders produced by completed checkouts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AddressId, CartId, CheckoutId, CurrencyCode, Money, OrderId, OrderStatus, PaymentMethod,
    ProviderId, UserId,
};

/// An order. Never edited after creation except by its own fulfillment status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub provider_id: ProviderId,
    pub address_id: AddressId,
    /// Session that produced the order, when it came from gateway checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_id: Option<CheckoutId>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub currency: CurrencyCode,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub const fn total_money(&self) -> Money {
        Money::new(self.total, self.currency)
    }
}
