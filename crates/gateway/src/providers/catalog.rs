//! In-process catalog provider.
//!
//! Serves a fixed list of canonical products and keeps carts and orders in
//! memory. Supports every capability unless narrowed with
//! [`CatalogProvider::with_capabilities`].
//!
//! Search filters arrive in the provider's vocabulary. A catalog built from a
//! record with field or category mappings is given the matching
//! [`ProviderVocabulary`] so it reads the keys it is actually sent.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use bazaar_core::{
    AddressId, CanonicalProduct, Capability, Cart, CartId, CurrencyCode, Order, OrderId,
    OrderStatus, PaymentMethod, ProductId, ProviderId, UserId,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ProviderAdapter, ProviderError};
use crate::mapping::{CATEGORIES_FIELD, ProviderFilters, ProviderVocabulary};

/// Query words shorter than this are ignored.
const MIN_QUERY_WORD_LEN: usize = 2;

/// Catalog-backed provider with in-memory carts and orders.
#[derive(Debug)]
pub struct CatalogProvider {
    id: ProviderId,
    capabilities: BTreeSet<Capability>,
    currency: CurrencyCode,
    vocabulary: ProviderVocabulary,
    products: Vec<CanonicalProduct>,
    carts: RwLock<HashMap<UserId, Cart>>,
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl CatalogProvider {
    /// Create a provider owning `products`. Each product's `provider_id` is
    /// rewritten to this provider's id.
    #[must_use]
    pub fn new(id: impl Into<ProviderId>, products: Vec<CanonicalProduct>) -> Self {
        let id = id.into();
        let products = products
            .into_iter()
            .map(|mut p| {
                p.provider_id = id.clone();
                p
            })
            .collect();
        Self {
            id,
            capabilities: Capability::ALL.into_iter().collect(),
            currency: CurrencyCode::default(),
            vocabulary: ProviderVocabulary::default(),
            products,
            carts: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Narrow the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Read search filters through `vocabulary` instead of canonical names.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: ProviderVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    fn product(&self, product_id: &ProductId) -> Option<&CanonicalProduct> {
        self.products.iter().find(|p| &p.id == product_id)
    }

    fn cart_id(user_id: &UserId) -> CartId {
        CartId::new(format!("CART-{user_id}"))
    }

    fn ensure(&self, capability: Capability) -> Result<(), ProviderError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(ProviderError::unsupported(self, capability))
        }
    }
}

/// Any query word of two or more characters appears in the product's
/// name, brand, category, or description.
fn matches_query(product: &CanonicalProduct, query: Option<&str>) -> bool {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let haystack = [
        Some(product.name.as_str()),
        product.brand.as_deref(),
        product.category.as_deref(),
        product.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    query
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_QUERY_WORD_LEN)
        .any(|w| haystack.contains(&w.to_lowercase()))
}

fn matches_filters(
    product: &CanonicalProduct,
    filters: &ProviderFilters,
    vocabulary: &ProviderVocabulary,
) -> bool {
    let amount = product.price.amount;
    if filters
        .decimal(vocabulary.field("priceMin"))
        .is_some_and(|min| amount < min)
        || filters
            .decimal(vocabulary.field("priceMax"))
            .is_some_and(|max| amount > max)
    {
        return false;
    }

    let categories = filters.strings(vocabulary.field(CATEGORIES_FIELD));
    if !categories.is_empty() {
        let Some(category) = product.category.as_deref() else {
            return false;
        };
        if !categories
            .iter()
            .any(|c| category.starts_with(vocabulary.canonical_category(c)))
        {
            return false;
        }
    }

    let brands = filters.strings(vocabulary.field("brands"));
    if !brands.is_empty() {
        let Some(brand) = product.brand.as_deref() else {
            return false;
        };
        if !brands.iter().any(|b| b.eq_ignore_ascii_case(brand)) {
            return false;
        }
    }

    true
}

#[async_trait]
impl ProviderAdapter for CatalogProvider {
    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    async fn search(
        &self,
        query: Option<&str>,
        filters: &ProviderFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        self.ensure(Capability::Search)?;
        let skip = page.saturating_sub(1) as usize * limit as usize;
        let results: Vec<CanonicalProduct> = self
            .products
            .iter()
            .filter(|p| matches_query(p, query) && matches_filters(p, filters, &self.vocabulary))
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect();
        debug!(provider_id = %self.id, count = results.len(), "Catalog search");
        Ok(results)
    }

    async fn get_details(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        self.ensure(Capability::Details)?;
        Ok(self.product(product_id).cloned())
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ProviderError> {
        self.ensure(Capability::Cart)?;
        let product = self
            .product(product_id)
            .ok_or_else(|| ProviderError::NotFound(format!("Product {product_id}")))?;

        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(user_id.clone())
            .or_insert_with(|| Cart::empty(Self::cart_id(user_id), user_id.clone(), self.currency));
        cart.add_item(product, quantity);
        Ok(cart.clone())
    }

    async fn update_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, ProviderError> {
        self.ensure(Capability::Cart)?;
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(user_id)
            .ok_or_else(|| ProviderError::NotFound(format!("Cart for user {user_id}")))?;
        if !cart.set_quantity(product_id, quantity) {
            return Err(ProviderError::NotFound(format!("Cart item {product_id}")));
        }
        Ok(cart.clone())
    }

    async fn remove_from_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Cart, ProviderError> {
        self.ensure(Capability::Cart)?;
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(user_id)
            .ok_or_else(|| ProviderError::NotFound(format!("Cart for user {user_id}")))?;
        cart.remove_item(product_id);
        Ok(cart.clone())
    }

    async fn get_cart(&self, user_id: &UserId) -> Result<Cart, ProviderError> {
        self.ensure(Capability::Cart)?;
        let carts = self.carts.read().await;
        Ok(carts.get(user_id).cloned().unwrap_or_else(|| {
            Cart::empty(Self::cart_id(user_id), user_id.clone(), self.currency)
        }))
    }

    async fn create_order(
        &self,
        user_id: &UserId,
        cart_id: &CartId,
        address_id: AddressId,
        payment_method: PaymentMethod,
    ) -> Result<Order, ProviderError> {
        self.ensure(Capability::Order)?;
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(user_id)
            .filter(|c| &c.id == cart_id && !c.is_empty())
            .ok_or_else(|| ProviderError::InvalidInput(format!("Cart {cart_id} is empty")))?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            user_id: user_id.clone(),
            cart_id: cart_id.clone(),
            provider_id: self.id.clone(),
            address_id,
            checkout_id: None,
            status: OrderStatus::Pending,
            payment_method,
            currency: cart.currency,
            total: cart.total.amount,
            created_at: now,
            updated_at: now,
        };
        cart.clear();
        drop(carts);

        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order_status(&self, order_id: OrderId) -> Result<Order, ProviderError> {
        self.ensure(Capability::Order)?;
        self.orders
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Order {order_id}")))
    }
}
