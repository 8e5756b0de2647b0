//! Process-local checkout store.

use std::collections::HashMap;

use async_trait::async_trait;
use bazaar_core::{
    Address, AddressId, CheckoutId, CheckoutSession, CheckoutStatus, Order, OrderId, UserId,
};
use tokio::sync::RwLock;

use super::{CheckoutStore, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<CheckoutId, CheckoutSession>,
    addresses: HashMap<AddressId, (UserId, Address)>,
    orders: HashMap<OrderId, Order>,
}

/// All tables behind one lock, so each trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryCheckoutStore {
    tables: RwLock<Tables>,
}

impl MemoryCheckoutStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders written so far.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Number of addresses written so far.
    pub async fn address_count(&self) -> usize {
        self.tables.read().await.addresses.len()
    }
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn insert_session(&self, session: &CheckoutSession) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.id) {
            return Err(RepositoryError::Conflict(format!(
                "checkout {} already exists",
                session.id
            )));
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(
        &self,
        id: CheckoutId,
        user_id: &UserId,
    ) -> Result<Option<CheckoutSession>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(&id)
            .filter(|s| &s.user_id == user_id)
            .cloned())
    }

    async fn update_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&session.id) {
            Some(stored)
                if stored.user_id == session.user_id && stored.version == expected_version =>
            {
                *stored = session.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_status_unless(
        &self,
        id: CheckoutId,
        user_id: &UserId,
        status: CheckoutStatus,
        unless: &[CheckoutStatus],
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(stored) if &stored.user_id == user_id && !unless.contains(&stored.status) => {
                stored.status = status;
                stored.version += 1;
                stored.updated_at = chrono::Utc::now();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn complete_session(
        &self,
        session: &CheckoutSession,
        expected_version: i64,
        address: &Address,
        order: &Order,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let landed = match tables.sessions.get_mut(&session.id) {
            Some(stored)
                if stored.user_id == session.user_id && stored.version == expected_version =>
            {
                *stored = session.clone();
                stored.status = CheckoutStatus::Completed;
                true
            }
            _ => false,
        };
        if landed {
            tables
                .addresses
                .insert(order.address_id, (order.user_id.clone(), address.clone()));
            tables.orders.insert(order.id, order.clone());
        }
        Ok(landed)
    }

    async fn get_order(
        &self,
        id: OrderId,
        user_id: &UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&id)
            .filter(|o| &o.user_id == user_id)
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{
        Cart, CartId, CheckoutPricing, CurrencyCode, OrderStatus, PaymentMethod, ProviderId,
    };
    use chrono::{Duration, Utc};

    use super::*;

    fn session() -> CheckoutSession {
        let cart = Cart::empty(CartId::new("CART-u1"), UserId::new("u1"), CurrencyCode::INR);
        CheckoutSession::open(
            &cart,
            ProviderId::new("mock"),
            CurrencyCode::INR,
            &CheckoutPricing::default(),
            Utc::now(),
            Duration::minutes(30),
        )
    }

    #[tokio::test]
    async fn test_session_scoped_to_user() {
        let store = MemoryCheckoutStore::new();
        let s = session();
        store.insert_session(&s).await.unwrap();

        assert!(store.get_session(s.id, &UserId::new("u1")).await.unwrap().is_some());
        assert!(store.get_session(s.id, &UserId::new("intruder")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let store = MemoryCheckoutStore::new();
        let mut s = session();
        store.insert_session(&s).await.unwrap();

        let mut racer = s.clone();
        let expected = s.next_revision(Utc::now());
        assert!(store.update_session(&s, expected).await.unwrap());

        let stale = racer.next_revision(Utc::now());
        assert!(!store.update_session(&racer, stale).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_status_unless_terminal() {
        let store = MemoryCheckoutStore::new();
        let s = session();
        store.insert_session(&s).await.unwrap();
        let user = UserId::new("u1");

        let changed = store
            .set_status_unless(s.id, &user, CheckoutStatus::Cancelled, &CheckoutStatus::TERMINAL)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let again = store
            .set_status_unless(s.id, &user, CheckoutStatus::Cancelled, &CheckoutStatus::TERMINAL)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    fn order_for(s: &CheckoutSession) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::generate(),
            user_id: s.user_id.clone(),
            cart_id: s.cart_id.clone(),
            provider_id: s.provider_id.clone(),
            address_id: AddressId::generate(),
            checkout_id: Some(s.id),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Upi,
            currency: s.currency,
            total: s.total,
            created_at: now,
            updated_at: now,
        }
    }

    fn address() -> Address {
        Address {
            name: None,
            phone: None,
            line1: "14 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: None,
            pincode: "560001".to_string(),
            country: "IN".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_writes_address_and_order_together() {
        let store = MemoryCheckoutStore::new();
        let mut s = session();
        store.insert_session(&s).await.unwrap();

        let expected = s.next_revision(Utc::now());
        assert!(store.complete_session(&s, expected, &address(), &order_for(&s)).await.unwrap());
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.address_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_complete_leaves_no_address() {
        let store = MemoryCheckoutStore::new();
        let mut s = session();
        store.insert_session(&s).await.unwrap();

        let mut racer = s.clone();
        let expected = s.next_revision(Utc::now());
        assert!(store.update_session(&s, expected).await.unwrap());

        let stale = racer.next_revision(Utc::now());
        let landed = store
            .complete_session(&racer, stale, &address(), &order_for(&racer))
            .await
            .unwrap();
        assert!(!landed);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.address_count().await, 0);
    }
}
