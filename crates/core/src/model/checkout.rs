//! Checkout session and its pricing rules.
//!
//! The session is a pure value here. Loading, expiry flips, and persistence
//! live in the gateway; this module owns the arithmetic and the status rules
//! so they can be tested without a store.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::Address;
use super::cart::{Cart, CartItem};
use crate::types::money::round_money;
use crate::types::{
    CartId, CheckoutId, CheckoutStatus, CurrencyCode, Money, PaymentMethod, ProviderId, UserId,
};

/// A status rule was violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutRuleError {
    #[error("Checkout already completed")]
    AlreadyCompleted,
    #[error("Checkout was cancelled")]
    Cancelled,
    #[error("Checkout session expired")]
    Expired,
    #[error("Shipping address required")]
    MissingShippingAddress,
    #[error("Payment method required")]
    MissingPaymentMethod,
}

impl CheckoutRuleError {
    const fn for_terminal(status: CheckoutStatus) -> Option<Self> {
        match status {
            CheckoutStatus::Completed => Some(Self::AlreadyCompleted),
            CheckoutStatus::Cancelled => Some(Self::Cancelled),
            CheckoutStatus::Expired => Some(Self::Expired),
            CheckoutStatus::Created | CheckoutStatus::ShippingSet | CheckoutStatus::PaymentSet => {
                None
            }
        }
    }
}

/// Rates used to price a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutPricing {
    /// Flat tax rate applied to the subtotal (e.g. `0.18`).
    pub tax_rate: Decimal,
    /// Shipping for the first unit.
    pub shipping_base: Decimal,
    /// Shipping added for each unit after the first.
    pub shipping_per_extra_unit: Decimal,
}

impl Default for CheckoutPricing {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            shipping_base: Decimal::new(50, 0),
            shipping_per_extra_unit: Decimal::new(20, 0),
        }
    }
}

impl CheckoutPricing {
    /// Shipping for `units` items: `base + per_extra_unit × (units − 1)`.
    #[must_use]
    pub fn shipping_for(&self, units: u32) -> Decimal {
        if units == 0 {
            return Decimal::ZERO;
        }
        self.shipping_base + self.shipping_per_extra_unit * Decimal::from(units - 1)
    }

    #[must_use]
    pub fn tax_on(&self, subtotal: Decimal) -> Decimal {
        round_money(subtotal * self.tax_rate)
    }
}

/// A time-bounded checkout workflow for one cart.
///
/// Invariant: `total == subtotal + tax + shipping_cost - discount` after
/// every mutation made through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: CheckoutId,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub provider_id: ProviderId,
    pub status: CheckoutStatus,
    /// Cart lines frozen at creation. Later cart edits do not reach here.
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    /// Bumped on every write; stores only accept a write carrying the
    /// version they currently hold.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Open a session from a non-empty cart.
    ///
    /// Shipping starts at zero and is priced once an address is known.
    #[must_use]
    pub fn open(
        cart: &Cart,
        provider_id: ProviderId,
        currency: CurrencyCode,
        pricing: &CheckoutPricing,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let subtotal = round_money(cart.items.iter().map(CartItem::line_total).sum());
        let tax = pricing.tax_on(subtotal);
        let mut session = Self {
            id: CheckoutId::generate(),
            user_id: cart.user_id.clone(),
            cart_id: cart.id.clone(),
            provider_id,
            status: CheckoutStatus::Created,
            items: cart.items.clone(),
            subtotal,
            tax,
            shipping_cost: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            currency,
            shipping_address: None,
            billing_address: None,
            payment_method: None,
            version: 0,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        };
        session.recompute_total();
        session
    }

    /// Total units across all lines.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn recompute_total(&mut self) {
        self.total = self.subtotal + self.tax + self.shipping_cost - self.discount;
    }

    /// Past its expiry but not yet flipped to `EXPIRED`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now > self.expires_at
    }

    /// Fail if the session is in a terminal status.
    ///
    /// # Errors
    ///
    /// Returns the rule error matching the terminal status.
    pub const fn ensure_open(&self) -> Result<(), CheckoutRuleError> {
        match CheckoutRuleError::for_terminal(self.status) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record the delivery address, price shipping, and renew the expiry.
    ///
    /// # Errors
    ///
    /// Returns a rule error if the session is terminal.
    pub fn set_shipping_address(
        &mut self,
        address: Address,
        pricing: &CheckoutPricing,
        now: DateTime<Utc>,
        renewal: Duration,
    ) -> Result<(), CheckoutRuleError> {
        self.ensure_open()?;
        self.shipping_address = Some(address);
        self.shipping_cost = pricing.shipping_for(self.units());
        self.recompute_total();
        self.status = CheckoutStatus::ShippingSet;
        self.expires_at = now + renewal;
        Ok(())
    }

    /// Record the billing address. Status is unaffected.
    ///
    /// # Errors
    ///
    /// Returns a rule error if the session is terminal.
    pub fn set_billing_address(&mut self, address: Address) -> Result<(), CheckoutRuleError> {
        self.ensure_open()?;
        self.billing_address = Some(address);
        Ok(())
    }

    /// Record the payment method. Advances `SHIPPING_SET` to `PAYMENT_SET`.
    ///
    /// # Errors
    ///
    /// Returns a rule error if the session is terminal.
    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutRuleError> {
        self.ensure_open()?;
        self.payment_method = Some(method);
        if self.status == CheckoutStatus::ShippingSet {
            self.status = CheckoutStatus::PaymentSet;
        }
        Ok(())
    }

    /// Check everything completion needs, returning the chosen payment method.
    ///
    /// # Errors
    ///
    /// Returns a rule error if the session is terminal or incomplete.
    pub fn ensure_completable(&self) -> Result<PaymentMethod, CheckoutRuleError> {
        self.ensure_open()?;
        if self.shipping_address.is_none() {
            return Err(CheckoutRuleError::MissingShippingAddress);
        }
        self.payment_method
            .ok_or(CheckoutRuleError::MissingPaymentMethod)
    }

    /// Prepare the next write: bump the version and timestamp.
    ///
    /// Returns the version the store must currently hold for the write to land.
    pub fn next_revision(&mut self, now: DateTime<Utc>) -> i64 {
        let expected = self.version;
        self.version += 1;
        self.updated_at = now;
        expected
    }

    #[must_use]
    pub const fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }
}
