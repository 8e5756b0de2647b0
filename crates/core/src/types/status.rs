//! Capability and status enums.
//!
//! All of these serialize as `SCREAMING_SNAKE_CASE` strings, which is also
//! the form persisted in text columns.

use serde::{Deserialize, Serialize};

/// A feature a provider may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Search,
    Details,
    Cart,
    Order,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 4] = [Self::Search, Self::Details, Self::Cart, Self::Order];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "SEARCH",
            Self::Details => "DETAILS",
            Self::Cart => "CART",
            Self::Order => "ORDER",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    /// Case-insensitive, so provider records may say `search` or `SEARCH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SEARCH" => Ok(Self::Search),
            "DETAILS" => Ok(Self::Details),
            "CART" => Ok(Self::Cart),
            "ORDER" => Ok(Self::Order),
            _ => Err(format!("invalid capability: {s}")),
        }
    }
}

/// Stock status reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    #[default]
    InStock,
    OutOfStock,
    LowStock,
    Preorder,
}

/// Checkout session lifecycle.
///
/// `CREATED → SHIPPING_SET → PAYMENT_SET → {COMPLETED | CANCELLED | EXPIRED}`.
/// The three right-hand states are terminal and never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    #[default]
    Created,
    ShippingSet,
    PaymentSet,
    Completed,
    Cancelled,
    Expired,
}

impl CheckoutStatus {
    /// Statuses that accept no further transitions.
    pub const TERMINAL: [Self; 3] = [Self::Completed, Self::Cancelled, Self::Expired];

    /// Statuses a live session can be in.
    pub const OPEN: [Self; 3] = [Self::Created, Self::ShippingSet, Self::PaymentSet];

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::ShippingSet => "SHIPPING_SET",
            Self::PaymentSet => "PAYMENT_SET",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "SHIPPING_SET" => Ok(Self::ShippingSet),
            "PAYMENT_SET" => Ok(Self::PaymentSet),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(format!("invalid checkout status: {s}")),
        }
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the buyer intends to pay. Recorded only; no gateway is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cod,
    Card,
    Upi,
    Wallet,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Card => "CARD",
            Self::Upi => "UPI",
            Self::Wallet => "WALLET",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "CARD" => Ok(Self::Card),
            "UPI" => Ok(Self::Upi),
            "WALLET" => Ok(Self::Wallet),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
