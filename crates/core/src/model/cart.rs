//! Shopping cart with derived totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::CanonicalProduct;
use crate::types::{CartId, CurrencyCode, Money, ProductId, ProviderId, UserId};

/// A line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub provider_id: ProviderId,
    /// Always at least 1. A line that would drop to zero is removed.
    pub quantity: u32,
    /// Price captured when the line was added.
    pub unit_price: Money,
    /// Product as it looked when the line was added.
    pub product: CanonicalProduct,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.amount * Decimal::from(self.quantity)
    }
}

/// One user's active cart.
///
/// `subtotal`, `tax`, `total`, and `item_count` are derived from `items`
/// by [`Cart::recompute`]. Every mutator here calls it, so a cart handed
/// out by this type is never stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub currency: CurrencyCode,
    pub item_count: u32,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty(id: CartId, user_id: UserId, currency: CurrencyCode) -> Self {
        Self {
            id,
            user_id,
            items: Vec::new(),
            subtotal: Money::zero(currency),
            tax: Money::zero(currency),
            total: Money::zero(currency),
            currency,
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Add `quantity` of a product. An existing line for the same product is
    /// incremented rather than duplicated.
    pub fn add_item(&mut self, product: &CanonicalProduct, quantity: u32) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product_id: product.id.clone(),
                provider_id: product.provider_id.clone(),
                quantity,
                unit_price: product.price,
                product: product.clone(),
            });
        }
        self.recompute();
    }

    /// Set a line's quantity absolutely. Returns `false` if the product is not
    /// in the cart. A quantity of zero removes the line.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        let Some(line) = self.items.iter_mut().find(|i| &i.product_id == product_id) else {
            return false;
        };
        line.quantity = quantity;
        self.recompute();
        true
    }

    /// Drop a line entirely. Returns `false` if nothing was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        let removed = self.items.len() != before;
        self.recompute();
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    /// Rebuild totals from the current lines. Carts carry no tax.
    pub fn recompute(&mut self) {
        let subtotal: Decimal = self.items.iter().map(CartItem::line_total).sum();
        self.subtotal = Money::new(subtotal, self.currency);
        self.tax = Money::zero(self.currency);
        self.total = Money::new(subtotal, self.currency);
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use super::*;
    use crate::model::product::Availability;

    fn product(id: &str, price: &str) -> CanonicalProduct {
        CanonicalProduct {
            id: ProductId::new(id),
            provider_id: ProviderId::new("mock"),
            name: format!("Product {id}"),
            description: None,
            brand: None,
            category: None,
            price: Money::new(Decimal::from_str(price).unwrap(), CurrencyCode::INR),
            image_url: None,
            availability: Availability::default(),
            rating: None,
            review_count: None,
            attributes: BTreeMap::new(),
        }
    }

    fn cart() -> Cart {
        Cart::empty(CartId::new("CART-u1"), UserId::new("u1"), CurrencyCode::INR)
    }

    #[test]
    fn test_re_adding_increments_quantity() {
        let mut cart = cart();
        let p = product("a", "100.00");
        cart.add_item(&p, 2);
        cart.add_item(&p, 3);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.item_count, 5);
        assert_eq!(cart.subtotal.amount, Decimal::from_str("500.00").unwrap());
    }

    #[test]
    fn test_totals_follow_items() {
        let mut cart = cart();
        cart.add_item(&product("a", "10.50"), 2);
        cart.add_item(&product("b", "3.25"), 4);
        assert_eq!(cart.subtotal.amount, Decimal::from_str("34.00").unwrap());
        assert_eq!(cart.total, cart.subtotal);
        assert!(cart.tax.amount.is_zero());

        assert!(cart.set_quantity(&ProductId::new("a"), 1));
        assert_eq!(cart.subtotal.amount, Decimal::from_str("23.50").unwrap());
        assert_eq!(cart.item_count, 5);

        assert!(cart.remove_item(&ProductId::new("b")));
        assert_eq!(cart.subtotal.amount, Decimal::from_str("10.50").unwrap());
        assert_eq!(cart.item_count, 1);
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = cart();
        assert!(!cart.set_quantity(&ProductId::new("missing"), 3));
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = cart();
        cart.add_item(&product("a", "1.00"), 1);
        assert!(cart.set_quantity(&ProductId::new("a"), 0));
        assert!(cart.is_empty());
        assert!(cart.total.amount.is_zero());
    }
}
