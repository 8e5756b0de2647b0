//! Checkout persistence.
//!
//! Sessions, addresses, and orders are kept behind [`CheckoutStore`], a keyed
//! row store with single-row reads and single-statement conditional writes.
//!
//! - [`MemoryCheckoutStore`] - process-local store, used when no database is
//!   configured and throughout the tests
//! - [`PgCheckoutStore`] - `PostgreSQL` store (see its module docs for the
//!   tables it expects)
//!
//! Every session write is guarded by the session's `version`: a write lands
//! only if the stored row still carries the version the caller read.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use bazaar_core::{
    Address, CheckoutId, CheckoutSession, CheckoutStatus, Order, OrderId, UserId,
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryCheckoutStore;
pub use postgres::PgCheckoutStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The row changed since it was read.
    #[error("{0}")]
    Conflict(String),
}

/// Storage for checkout sessions and the orders they produce.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn insert_session(&self, session: &CheckoutSession) -> Result<(), RepositoryError>;

    /// Load a session owned by `user_id`.
    async fn get_session(
        &self,
        id: CheckoutId,
        user_id: &UserId,
    ) -> Result<Option<CheckoutSession>, RepositoryError>;

    /// Overwrite the stored session if it still holds `expected_version`.
    ///
    /// Returns `false` when the version did not match (or the row is gone).
    async fn update_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
    ) -> Result<bool, RepositoryError>;

    /// Set `status` on the session if its current status is not one of
    /// `unless`. Returns the number of rows changed (0 or 1).
    async fn set_status_unless(
        &self,
        id: CheckoutId,
        user_id: &UserId,
        status: CheckoutStatus,
        unless: &[CheckoutStatus],
    ) -> Result<u64, RepositoryError>;

    /// Mark the session COMPLETED, store `address` under `order.address_id`,
    /// and insert `order`, as one write.
    ///
    /// The write lands only if the session still holds `expected_version`.
    /// Returns `false` otherwise; neither the address nor the order is
    /// stored in that case.
    async fn complete_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
        address: &Address,
        order: &Order,
    ) -> Result<bool, RepositoryError>;

    async fn get_order(
        &self,
        id: OrderId,
        user_id: &UserId,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
