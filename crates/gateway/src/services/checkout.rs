//! Checkout workflow.
//!
//! `CREATED → SHIPPING_SET → PAYMENT_SET → COMPLETED`, with `CANCELLED` and
//! `EXPIRED` reachable from any open status. The arithmetic and status rules
//! live on [`CheckoutSession`]; this service loads, applies, and writes back.
//!
//! Expiry is lazy: whichever call first sees a session past `expires_at`
//! flips it to `EXPIRED` in the store before doing anything else.
//!
//! Writes are compare-and-swap on the session `version`. A write that loses
//! a race fails with `VALIDATION_ERROR` (`details.reason = "version_conflict"`)
//! and changes nothing.

use std::sync::Arc;

use bazaar_core::{
    Address, AddressId, CartItem, CheckoutId, CheckoutSession, CheckoutStatus, Capability, Order, OrderId,
    OrderStatus, PaymentMethod, ProviderId, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{CartService, Federation, MoneyView};
use crate::config::CheckoutConfig;
use crate::db::{CheckoutStore, RepositoryError};
use crate::error::ToolError;
use crate::providers::ProviderError;
use crate::tools::requests::{
    CheckoutRef, CompleteCheckoutRequest, CreateCheckoutRequest, OrderStatusRequest,
    UpdateCheckoutRequest,
};

const CONFLICT_MESSAGE: &str = "Checkout was modified concurrently; reload and retry";

// =============================================================================
// Responses
// =============================================================================

/// A checkout session as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub checkout_id: CheckoutId,
    pub user_id: UserId,
    pub provider_id: ProviderId,
    pub status: CheckoutStatus,
    pub items: Vec<CartItem>,
    pub item_count: usize,
    pub subtotal: MoneyView,
    pub tax: MoneyView,
    pub shipping_cost: MoneyView,
    pub discount: MoneyView,
    pub total: MoneyView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub version: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<&CheckoutSession> for CheckoutView {
    fn from(session: &CheckoutSession) -> Self {
        Self {
            checkout_id: session.id,
            user_id: session.user_id.clone(),
            provider_id: session.provider_id.clone(),
            status: session.status,
            items: session.items.clone(),
            item_count: session.items.len(),
            subtotal: session.money(session.subtotal).into(),
            tax: session.money(session.tax).into(),
            shipping_cost: session.money(session.shipping_cost).into(),
            discount: session.money(session.discount).into(),
            total: session.money(session.total).into(),
            shipping_address: session.shipping_address.clone(),
            billing_address: session.billing_address.clone(),
            payment_method: session.payment_method,
            version: session.version,
            expires_at: session.expires_at,
        }
    }
}

/// Result of a completion attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckoutOutcome {
    /// Above the high-value threshold without `confirmed`. Nothing changed.
    #[serde(rename_all = "camelCase")]
    ConfirmationRequired {
        requires_confirmation: bool,
        total: MoneyView,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        order_id: OrderId,
        checkout_id: CheckoutId,
        status: CheckoutStatus,
        total: MoneyView,
        payment_method: PaymentMethod,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledCheckout {
    pub checkout_id: CheckoutId,
    pub status: CheckoutStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_id: Option<CheckoutId>,
    pub provider_id: ProviderId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total: MoneyView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            checkout_id: order.checkout_id,
            total: order.total_money().into(),
            provider_id: order.provider_id,
            status: order.status,
            payment_method: order.payment_method,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    carts: CartService,
    federation: Federation,
    config: CheckoutConfig,
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CheckoutStore>,
        federation: Federation,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            carts: CartService::new(federation.clone()),
            federation,
            config,
        }
    }

    /// Open a session from the user's cart, freezing its lines and prices.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the cart does not exist, `VALIDATION_ERROR` if
    /// it is empty, and `PROVIDER_ERROR` if no cart provider is usable.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, cart_id = %request.cart_id))]
    pub async fn create(&self, request: &CreateCheckoutRequest) -> Result<CheckoutView, ToolError> {
        let (provider_id, cart) = self
            .carts
            .checkout_cart(&request.user_id, &request.cart_id, request.provider.as_ref())
            .await?;

        let session = CheckoutSession::open(
            &cart,
            provider_id,
            self.config.currency,
            &self.config.pricing,
            Utc::now(),
            self.config.session_ttl,
        );
        self.store.insert_session(&session).await?;

        info!(
            checkout_id = %session.id,
            provider_id = %session.provider_id,
            total = %session.total,
            "Checkout created"
        );
        Ok(CheckoutView::from(&session))
    }

    /// Apply shipping address, billing address, and payment method (in that
    /// order) as one write.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` for an unknown session and `VALIDATION_ERROR` if
    /// it is terminal, expired, or was changed concurrently.
    #[instrument(skip(self, request), fields(checkout_id = %request.checkout_id))]
    pub async fn update(&self, request: &UpdateCheckoutRequest) -> Result<CheckoutView, ToolError> {
        let now = Utc::now();
        let mut session = self.load(request.checkout_id, &request.user_id, now).await?;
        session.ensure_open()?;

        if let Some(address) = &request.shipping_address {
            session.set_shipping_address(
                address.clone(),
                &self.config.pricing,
                now,
                self.config.renewal,
            )?;
        }
        if let Some(address) = &request.billing_address {
            session.set_billing_address(address.clone())?;
        }
        if let Some(method) = request.payment_method {
            session.set_payment_method(method)?;
        }

        let expected = session.next_revision(now);
        if !self.store.update_session(&session, expected).await? {
            return Err(RepositoryError::Conflict(CONFLICT_MESSAGE.to_string()).into());
        }

        info!(status = %session.status, total = %session.total, "Checkout updated");
        Ok(CheckoutView::from(&session))
    }

    /// Read a session. An overdue session comes back `EXPIRED`.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` for an unknown session.
    #[instrument(skip(self, request), fields(checkout_id = %request.checkout_id))]
    pub async fn get(&self, request: &CheckoutRef) -> Result<CheckoutView, ToolError> {
        let session = self
            .load(request.checkout_id, &request.user_id, Utc::now())
            .await?;
        Ok(CheckoutView::from(&session))
    }

    /// Complete the session and create exactly one order.
    ///
    /// A total above the high-value threshold needs `confirmed`; without it
    /// the call succeeds with [`CheckoutOutcome::ConfirmationRequired`] and
    /// changes nothing, so it can simply be repeated with `confirmed: true`.
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_ERROR` if the session is terminal, expired,
    /// missing a shipping address or payment method, or was changed
    /// concurrently.
    #[instrument(skip(self, request), fields(checkout_id = %request.checkout_id, confirmed = request.confirmed))]
    pub async fn complete(
        &self,
        request: &CompleteCheckoutRequest,
    ) -> Result<CheckoutOutcome, ToolError> {
        let now = Utc::now();
        let mut session = self.load(request.checkout_id, &request.user_id, now).await?;
        let payment_method = session.ensure_completable()?;

        if session.total > self.config.high_value_threshold && !request.confirmed {
            info!(total = %session.total, "High-value checkout awaiting confirmation");
            return Ok(CheckoutOutcome::ConfirmationRequired {
                requires_confirmation: true,
                total: session.money(session.total).into(),
                message: "High-value order requires confirmation".to_string(),
            });
        }

        let Some(address) = session.shipping_address.clone() else {
            return Err(bazaar_core::CheckoutRuleError::MissingShippingAddress.into());
        };

        let expected = session.next_revision(now);
        session.status = CheckoutStatus::Completed;
        let order = Order {
            id: OrderId::generate(),
            user_id: session.user_id.clone(),
            cart_id: session.cart_id.clone(),
            provider_id: session.provider_id.clone(),
            address_id: AddressId::generate(),
            checkout_id: Some(session.id),
            status: OrderStatus::Pending,
            payment_method,
            currency: session.currency,
            total: session.total,
            created_at: now,
            updated_at: now,
        };

        if !self
            .store
            .complete_session(&session, expected, &address, &order)
            .await?
        {
            return Err(RepositoryError::Conflict(CONFLICT_MESSAGE.to_string()).into());
        }

        info!(order_id = %order.id, total = %order.total, "Checkout completed");
        Ok(CheckoutOutcome::Completed {
            order_id: order.id,
            checkout_id: session.id,
            status: CheckoutStatus::Completed,
            total: order.total_money().into(),
            payment_method,
        })
    }

    /// Cancel an open session with one conditional update.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the session is unknown or already terminal.
    #[instrument(skip(self, request), fields(checkout_id = %request.checkout_id))]
    pub async fn cancel(&self, request: &CheckoutRef) -> Result<CancelledCheckout, ToolError> {
        self.load(request.checkout_id, &request.user_id, Utc::now())
            .await?;

        let changed = self
            .store
            .set_status_unless(
                request.checkout_id,
                &request.user_id,
                CheckoutStatus::Cancelled,
                &CheckoutStatus::TERMINAL,
            )
            .await?;
        if changed == 0 {
            return Err(ToolError::not_found(
                "Checkout not found or already completed/cancelled",
            ));
        }

        info!("Checkout cancelled");
        Ok(CancelledCheckout {
            checkout_id: request.checkout_id,
            status: CheckoutStatus::Cancelled,
        })
    }

    /// Look up an order, first among checkout orders, then with ORDER
    /// providers.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if nobody knows the order.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn order_status(&self, request: &OrderStatusRequest) -> Result<OrderView, ToolError> {
        if let Some(order) = self.store.get_order(request.order_id, &request.user_id).await? {
            return Ok(order.into());
        }

        let snapshot = self.federation.snapshot().await?;
        for record in snapshot.enabled_with(Capability::Order) {
            let Some(adapter) = self
                .federation
                .providers()
                .capable(&record.id, Capability::Order)
            else {
                continue;
            };
            match self
                .federation
                .bounded(adapter.get_order_status(request.order_id))
                .await
            {
                Ok(order) if order.user_id == request.user_id => return Ok(order.into()),
                Ok(_) | Err(ProviderError::NotFound(_)) => {}
                Err(e) => warn!(provider_id = %record.id, error = %e, "Order lookup failed"),
            }
        }

        Err(ToolError::not_found(format!(
            "Order not found: {}",
            request.order_id
        )))
    }

    /// Load a session, flipping it to `EXPIRED` first if it is overdue.
    async fn load(
        &self,
        id: CheckoutId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession, ToolError> {
        let session = self.fetch(id, user_id).await?;
        if !session.is_overdue(now) {
            return Ok(session);
        }

        let flipped = self
            .store
            .set_status_unless(id, user_id, CheckoutStatus::Expired, &CheckoutStatus::TERMINAL)
            .await?;
        debug!(checkout_id = %id, flipped, "Checkout expired on access");
        self.fetch(id, user_id).await
    }

    async fn fetch(&self, id: CheckoutId, user_id: &UserId) -> Result<CheckoutSession, ToolError> {
        self.store
            .get_session(id, user_id)
            .await?
            .ok_or_else(|| ToolError::not_found("Checkout session not found"))
    }
}
