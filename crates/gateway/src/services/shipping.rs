//! Standalone shipping estimate.
//!
//! Uses the same cost formula checkout applies when an address is set.

use bazaar_core::{CheckoutPricing, CurrencyCode, Money, ProductId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::MoneyView;

/// Pincode prefixes served by metro warehouses.
const METRO_PREFIXES: [&str; 4] = ["11", "40", "56", "60"];
const METRO_DELIVERY_DAYS: i64 = 2;
const STANDARD_DELIVERY_DAYS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingEstimate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub shipping_cost: MoneyView,
    pub estimated_delivery_days: i64,
    pub estimated_delivery_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ShippingEstimator {
    pricing: CheckoutPricing,
    currency: CurrencyCode,
}

impl ShippingEstimator {
    #[must_use]
    pub const fn new(pricing: CheckoutPricing, currency: CurrencyCode) -> Self {
        Self { pricing, currency }
    }

    #[must_use]
    pub fn estimate(
        &self,
        product_id: Option<ProductId>,
        pincode: &str,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> ShippingEstimate {
        let cost = self.pricing.shipping_for(quantity);
        let days = delivery_days(pincode);
        ShippingEstimate {
            product_id,
            shipping_cost: Money::new(cost, self.currency).into(),
            estimated_delivery_days: days,
            estimated_delivery_date: now + Duration::days(days),
        }
    }
}

#[must_use]
pub fn delivery_days(pincode: &str) -> i64 {
    let pincode = pincode.trim();
    if METRO_PREFIXES.iter().any(|p| pincode.starts_with(p)) {
        METRO_DELIVERY_DAYS
    } else {
        STANDARD_DELIVERY_DAYS
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_metro_pincodes_are_faster() {
        assert_eq!(delivery_days("110001"), 2);
        assert_eq!(delivery_days("400050"), 2);
        assert_eq!(delivery_days("560034"), 2);
        assert_eq!(delivery_days("600028"), 2);
        assert_eq!(delivery_days("682001"), 5);
    }

    #[test]
    fn test_cost_grows_per_extra_unit() {
        let estimator = ShippingEstimator::new(CheckoutPricing::default(), CurrencyCode::INR);
        let now = Utc::now();

        let one = estimator.estimate(None, "110001", 1, now);
        assert_eq!(one.shipping_cost.amount, Decimal::from(50));

        let three = estimator.estimate(Some(ProductId::new("p1")), "682001", 3, now);
        assert_eq!(three.shipping_cost.amount, Decimal::from(90));
        assert_eq!(three.shipping_cost.formatted, "₹90.00");
        assert_eq!(three.estimated_delivery_date, now + Duration::days(5));
    }
}
