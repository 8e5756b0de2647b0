//! `PostgreSQL` checkout store.
//!
//! # Tables
//!
//! - `checkout_sessions` - one row per session; `items` and the addresses
//!   are JSONB, money columns are NUMERIC, `version` is BIGINT
//! - `checkout_addresses` - addresses synthesized at completion (JSONB body)
//! - `checkout_orders` - orders created by completion
//!
//! The schema lives in `migrations/0001_checkout.sql`; apply it before
//! pointing the gateway at a database.
//!
//! Queries are checked at runtime (`sqlx::query`), so building the gateway
//! needs no database.

use std::str::FromStr;

use async_trait::async_trait;
use bazaar_core::{
    Address, AddressId, CartId, CartItem, CheckoutId, CheckoutSession, CheckoutStatus,
    CurrencyCode, Order, OrderId, OrderStatus, PaymentMethod, ProviderId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{CheckoutStore, RepositoryError};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: CheckoutId,
    user_id: String,
    cart_id: String,
    provider: String,
    status: String,
    items: Json<Vec<CartItem>>,
    subtotal: Decimal,
    tax: Decimal,
    shipping_cost: Decimal,
    discount: Decimal,
    total: Decimal,
    currency: String,
    shipping_address: Option<Json<Address>>,
    billing_address: Option<Json<Address>>,
    payment_method: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for CheckoutSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            cart_id: CartId::new(row.cart_id),
            provider_id: ProviderId::new(row.provider),
            status: parse_column("status", &row.status)?,
            items: row.items.0,
            subtotal: row.subtotal,
            tax: row.tax,
            shipping_cost: row.shipping_cost,
            discount: row.discount,
            total: row.total,
            currency: parse_column("currency", &row.currency)?,
            shipping_address: row.shipping_address.map(|a| a.0),
            billing_address: row.billing_address.map(|a| a.0),
            payment_method: row
                .payment_method
                .as_deref()
                .map(|m| parse_column("payment_method", m))
                .transpose()?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: String,
    cart_id: String,
    provider: String,
    address_id: AddressId,
    checkout_id: Option<CheckoutId>,
    status: String,
    payment_method: String,
    currency: String,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            cart_id: CartId::new(row.cart_id),
            provider_id: ProviderId::new(row.provider),
            address_id: row.address_id,
            checkout_id: row.checkout_id,
            status: parse_column::<OrderStatus>("status", &row.status)?,
            payment_method: parse_column::<PaymentMethod>("payment_method", &row.payment_method)?,
            currency: parse_column::<CurrencyCode>("currency", &row.currency)?,
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("{column} '{raw}': {e}")))
}

const SESSION_COLUMNS: &str = "id, user_id, cart_id, provider, status, items, subtotal, tax, \
     shipping_cost, discount, total, currency, shipping_address, billing_address, \
     payment_method, version, created_at, updated_at, expires_at";

// =============================================================================
// Store
// =============================================================================

/// Checkout store over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn insert_session(&self, session: &CheckoutSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO checkout_sessions (
                id, user_id, cart_id, provider, status, items, subtotal, tax,
                shipping_cost, discount, total, currency, shipping_address,
                billing_address, payment_method, version, created_at, updated_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ",
        )
        .bind(session.id)
        .bind(session.user_id.as_str())
        .bind(session.cart_id.as_str())
        .bind(session.provider_id.as_str())
        .bind(session.status.as_str())
        .bind(Json(&session.items))
        .bind(session.subtotal)
        .bind(session.tax)
        .bind(session.shipping_cost)
        .bind(session.discount)
        .bind(session.total)
        .bind(session.currency.code())
        .bind(session.shipping_address.as_ref().map(Json))
        .bind(session.billing_address.as_ref().map(Json))
        .bind(session.payment_method.map(|m| m.as_str()))
        .bind(session.version)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(
        &self,
        id: CheckoutId,
        user_id: &UserId,
    ) -> Result<Option<CheckoutSession>, RepositoryError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM checkout_sessions WHERE id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(CheckoutSession::try_from).transpose()
    }

    async fn update_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE checkout_sessions
            SET status = $3, subtotal = $4, tax = $5, shipping_cost = $6, discount = $7,
                total = $8, shipping_address = $9, billing_address = $10,
                payment_method = $11, version = $12, updated_at = $13, expires_at = $14
            WHERE id = $1 AND user_id = $2 AND version = $15
            ",
        )
        .bind(session.id)
        .bind(session.user_id.as_str())
        .bind(session.status.as_str())
        .bind(session.subtotal)
        .bind(session.tax)
        .bind(session.shipping_cost)
        .bind(session.discount)
        .bind(session.total)
        .bind(session.shipping_address.as_ref().map(Json))
        .bind(session.billing_address.as_ref().map(Json))
        .bind(session.payment_method.map(|m| m.as_str()))
        .bind(session.version)
        .bind(session.updated_at)
        .bind(session.expires_at)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_status_unless(
        &self,
        id: CheckoutId,
        user_id: &UserId,
        status: CheckoutStatus,
        unless: &[CheckoutStatus],
    ) -> Result<u64, RepositoryError> {
        let unless: Vec<&str> = unless.iter().map(CheckoutStatus::as_str).collect();
        let result = sqlx::query(
            r"
            UPDATE checkout_sessions
            SET status = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND NOT (status = ANY($4))
            ",
        )
        .bind(id)
        .bind(user_id.as_str())
        .bind(status.as_str())
        .bind(unless)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn complete_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
        address: &Address,
        order: &Order,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            WITH completed AS (
                UPDATE checkout_sessions
                SET status = 'COMPLETED', version = $3, updated_at = $4
                WHERE id = $1 AND user_id = $2 AND version = $5
                RETURNING id
            ),
            synthesized AS (
                INSERT INTO checkout_addresses (id, user_id, address, created_at)
                SELECT $9, $2, $14, $4
                FROM completed
                RETURNING id
            )
            INSERT INTO checkout_orders (
                id, user_id, cart_id, provider, address_id, checkout_id, status,
                payment_method, currency, total, created_at, updated_at
            )
            SELECT $6, $2, $7, $8, synthesized.id, completed.id, $10, $11, $12, $13, $4, $4
            FROM completed, synthesized
            ",
        )
        .bind(session.id)
        .bind(session.user_id.as_str())
        .bind(session.version)
        .bind(session.updated_at)
        .bind(expected_version)
        .bind(order.id)
        .bind(order.cart_id.as_str())
        .bind(order.provider_id.as_str())
        .bind(order.address_id)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.currency.code())
        .bind(order.total)
        .bind(Json(address))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_order(
        &self,
        id: OrderId,
        user_id: &UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, cart_id, provider, address_id, checkout_id, status,
                   payment_method, currency, total, created_at, updated_at
            FROM checkout_orders
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}
