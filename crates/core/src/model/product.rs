//! Canonical product as returned by any provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AvailabilityStatus, Money, ProductId, ProviderId};

/// A product in the gateway's own vocabulary.
///
/// Owned by exactly one provider (`provider_id`). Orchestrators copy and
/// wrap these but never edit one after a provider hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalProduct {
    pub id: ProductId,
    pub provider_id: ProviderId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Dot-delimited category path, e.g. `electronics.mobiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl CanonicalProduct {
    /// Identity used to collapse the same item listed by several providers.
    ///
    /// `lowercase(name)|lowercase(brand)|category`. A missing brand or
    /// category contributes an empty segment.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.name.to_lowercase(),
            self.brand.as_deref().unwrap_or_default().to_lowercase(),
            self.category.as_deref().unwrap_or_default()
        )
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.availability.in_stock
    }
}

/// Stock information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub in_stock: bool,
    #[serde(default)]
    pub status: AvailabilityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            in_stock: true,
            status: AvailabilityStatus::InStock,
            quantity: None,
        }
    }
}

/// Scalar attribute value. Nested structures are not allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CurrencyCode;
    use rust_decimal::Decimal;

    fn product(name: &str, brand: Option<&str>, category: Option<&str>) -> CanonicalProduct {
        CanonicalProduct {
            id: ProductId::new("p1"),
            provider_id: ProviderId::new("mock"),
            name: name.to_string(),
            description: None,
            brand: brand.map(str::to_string),
            category: category.map(str::to_string),
            price: Money::new(Decimal::new(1000, 0), CurrencyCode::INR),
            image_url: None,
            availability: Availability::default(),
            rating: None,
            review_count: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_dedup_key_lowercases_name_and_brand_only() {
        let p = product("Galaxy S24", Some("Samsung"), Some("electronics.Mobiles"));
        assert_eq!(p.dedup_key(), "galaxy s24|samsung|electronics.Mobiles");
    }

    #[test]
    fn test_dedup_key_missing_parts() {
        let p = product("Cable", None, None);
        assert_eq!(p.dedup_key(), "cable||");
    }

    #[test]
    fn test_product_deserializes_camel_case_with_defaults() {
        let json = r#"{
            "id": "sku-1",
            "providerId": "acme",
            "name": "Kettle",
            "price": {"amount": "1499.00", "currency": "INR"},
            "attributes": {"wattage": 1500, "color": "steel", "cordless": true}
        }"#;
        let p: CanonicalProduct = serde_json::from_str(json).unwrap();
        assert!(p.in_stock());
        assert_eq!(p.attributes.get("wattage"), Some(&AttributeValue::Integer(1500)));
        assert_eq!(p.attributes.get("cordless"), Some(&AttributeValue::Bool(true)));
    }
}
