//! Canonical commerce aggregates.
//!
//! Providers translate their own payloads into these shapes; the gateway
//! never sees a provider-specific product, cart, or order.

pub mod address;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;

pub use address::{Address, AddressError};
pub use cart::{Cart, CartItem};
pub use checkout::{CheckoutPricing, CheckoutRuleError, CheckoutSession};
pub use order::Order;
pub use product::{AttributeValue, Availability, CanonicalProduct};
