//! Typed tool inputs.
//!
//! Each tool's JSON input is deserialized into its own struct and checked
//! once here. Services receive only values that already passed.

use bazaar_core::{
    Address, CartId, CheckoutId, OrderId, PaymentMethod, ProductId, ProviderId, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::definitions::names;
use crate::error::ToolError;
use crate::mapping::CATEGORIES_FIELD;

pub const MAX_QUERY_LEN: usize = 500;
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 10;
pub const MAX_CART_QUANTITY: u32 = 99;

// =============================================================================
// Search
// =============================================================================

/// Result ordering for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Merge order, untouched.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    /// Highest first, unrated last.
    Rating,
}

/// Canonical search filters. Unknown keys are kept and forwarded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub price_min: Option<Decimal>,
    #[serde(default)]
    pub price_max: Option<Decimal>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchFilters {
    /// The filters as a canonical JSON object, ready for field mapping.
    #[must_use]
    pub fn to_canonical(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(min) = self.price_min {
            map.insert("priceMin".to_string(), Value::String(min.to_string()));
        }
        if let Some(max) = self.price_max {
            map.insert("priceMax".to_string(), Value::String(max.to_string()));
        }
        if !self.categories.is_empty() {
            map.insert(
                CATEGORIES_FIELD.to_string(),
                Value::from(self.categories.clone()),
            );
        }
        if !self.brands.is_empty() {
            map.insert("brands".to_string(), Value::from(self.brands.clone()));
        }
        if let Some(in_stock) = self.in_stock {
            map.insert("inStock".to_string(), Value::Bool(in_stock));
        }
        map
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationInput {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Resolved page window. `page ≥ 1`, `1 ≤ limit ≤ 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub pagination: PaginationInput,
    #[serde(default)]
    pub sort_by: SortBy,
}

impl SearchRequest {
    /// Page window with defaults applied and the limit capped at 100.
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.pagination.page.unwrap_or(1),
            limit: self
                .pagination
                .limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .min(MAX_PAGE_LIMIT),
        }
    }

    /// The query with surrounding whitespace removed; blank means none.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

impl Validate for SearchRequest {
    fn validate(&self) -> Result<(), ToolError> {
        if self
            .query
            .as_ref()
            .is_some_and(|q| q.chars().count() > MAX_QUERY_LEN)
        {
            return Err(ToolError::invalid_field(
                "query",
                format!("query must be at most {MAX_QUERY_LEN} characters"),
            ));
        }
        if self.pagination.page == Some(0) {
            return Err(ToolError::invalid_field("pagination.page", "page must be at least 1"));
        }
        if self.pagination.limit == Some(0) {
            return Err(ToolError::invalid_field("pagination.limit", "limit must be at least 1"));
        }
        let filters = &self.filters;
        if filters.price_min.is_some_and(|m| m.is_sign_negative())
            || filters.price_max.is_some_and(|m| m.is_sign_negative())
        {
            return Err(ToolError::invalid_field("filters", "price bounds must not be negative"));
        }
        if matches!((filters.price_min, filters.price_max), (Some(min), Some(max)) if min > max) {
            return Err(ToolError::invalid_field(
                "filters",
                "priceMin must not exceed priceMax",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsRequest {
    pub product_id: ProductId,
    /// Ask only this provider instead of scanning every DETAILS provider.
    #[serde(default)]
    pub provider: Option<ProviderId>,
}

impl Validate for ProductDetailsRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("productId", self.product_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub product_ids: Vec<ProductId>,
}

impl Validate for CompareRequest {
    fn validate(&self) -> Result<(), ToolError> {
        if self.product_ids.len() < MIN_COMPARE {
            return Err(ToolError::invalid_field(
                "productIds",
                "At least 2 products required for comparison",
            ));
        }
        if self.product_ids.len() > MAX_COMPARE {
            return Err(ToolError::invalid_field(
                "productIds",
                format!("At most {MAX_COMPARE} products can be compared"),
            ));
        }
        self.product_ids
            .iter()
            .try_for_each(|id| require("productIds", id.as_str()))
    }
}

/// Destination for a shipping estimate. Only the pincode is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShippingDestination {
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateShippingRequest {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub address: ShippingDestination,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl Validate for EstimateShippingRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("address.pincode", &self.address.pincode)?;
        check_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub provider: ProviderId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl Validate for AddItemRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())?;
        require("productId", self.product_id.as_str())?;
        require("provider", self.provider.as_str())?;
        check_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl Validate for UpdateItemRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())?;
        require("productId", self.product_id.as_str())?;
        check_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
}

impl Validate for RemoveItemRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())?;
        require("productId", self.product_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartRequest {
    pub user_id: UserId,
}

impl Validate for GetCartRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())
    }
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub user_id: UserId,
    pub cart_id: CartId,
    /// Provider holding the cart. Defaults to the cart resolution policy.
    #[serde(default)]
    pub provider: Option<ProviderId>,
}

impl Validate for CreateCheckoutRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())?;
        require("cartId", self.cart_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckoutRequest {
    pub checkout_id: CheckoutId,
    pub user_id: UserId,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl Validate for UpdateCheckoutRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())?;
        if self.shipping_address.is_none()
            && self.billing_address.is_none()
            && self.payment_method.is_none()
        {
            return Err(ToolError::validation(
                "Provide at least one of shippingAddress, billingAddress, paymentMethod",
            ));
        }
        if let Some(address) = &self.shipping_address {
            address.validate()?;
        }
        if let Some(address) = &self.billing_address {
            address.validate()?;
        }
        Ok(())
    }
}

/// Identifies one checkout session (get, cancel).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRef {
    pub checkout_id: CheckoutId,
    pub user_id: UserId,
}

impl Validate for CheckoutRef {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCheckoutRequest {
    pub checkout_id: CheckoutId,
    pub user_id: UserId,
    /// Explicit approval for totals above the high-value threshold.
    #[serde(default)]
    pub confirmed: bool,
}

impl Validate for CompleteCheckoutRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
}

impl Validate for OrderStatusRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("userId", self.user_id.as_str())
    }
}

// =============================================================================
// Utility
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderToolsRequest {
    pub provider_id: ProviderId,
}

impl Validate for ProviderToolsRequest {
    fn validate(&self) -> Result<(), ToolError> {
        require("providerId", self.provider_id.as_str())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// A parsed, validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    SearchProducts(SearchRequest),
    GetProductDetails(ProductDetailsRequest),
    CompareProducts(CompareRequest),
    EstimateShipping(EstimateShippingRequest),
    AddCartItem(AddItemRequest),
    UpdateCartItem(UpdateItemRequest),
    RemoveCartItem(RemoveItemRequest),
    GetCart(GetCartRequest),
    CreateCheckout(CreateCheckoutRequest),
    UpdateCheckout(UpdateCheckoutRequest),
    GetCheckout(CheckoutRef),
    CompleteCheckout(CompleteCheckoutRequest),
    CancelCheckout(CheckoutRef),
    GetOrderStatus(OrderStatusRequest),
    GetProviders,
    GetProviderTools(ProviderToolsRequest),
    GetTools,
}

impl ToolCall {
    /// Parse `input` for the tool called `name`.
    ///
    /// Returns `Ok(None)` when no tool has that name.
    ///
    /// # Errors
    ///
    /// Returns a `VALIDATION_ERROR` if the input does not deserialize into the
    /// tool's request type or fails its checks.
    pub fn parse(name: &str, input: Value) -> Result<Option<Self>, ToolError> {
        let call = match name {
            names::SEARCH_PRODUCTS => Self::SearchProducts(parse_input(name, input)?),
            names::GET_PRODUCT_DETAILS => Self::GetProductDetails(parse_input(name, input)?),
            names::COMPARE_PRODUCTS => Self::CompareProducts(parse_input(name, input)?),
            names::ESTIMATE_SHIPPING => Self::EstimateShipping(parse_input(name, input)?),
            names::CART_ADD_ITEM => Self::AddCartItem(parse_input(name, input)?),
            names::CART_UPDATE_ITEM_QTY => Self::UpdateCartItem(parse_input(name, input)?),
            names::CART_REMOVE_ITEM => Self::RemoveCartItem(parse_input(name, input)?),
            names::CART_GET_CART => Self::GetCart(parse_input(name, input)?),
            names::CHECKOUT_CREATE => Self::CreateCheckout(parse_input(name, input)?),
            names::CHECKOUT_UPDATE => Self::UpdateCheckout(parse_input(name, input)?),
            names::CHECKOUT_GET => Self::GetCheckout(parse_input(name, input)?),
            names::CHECKOUT_COMPLETE => Self::CompleteCheckout(parse_input(name, input)?),
            names::CHECKOUT_CANCEL => Self::CancelCheckout(parse_input(name, input)?),
            names::ORDER_GET_STATUS => Self::GetOrderStatus(parse_input(name, input)?),
            names::GET_PROVIDERS => Self::GetProviders,
            names::GET_PROVIDER_TOOLS => Self::GetProviderTools(parse_input(name, input)?),
            names::GET_TOOLS => Self::GetTools,
            _ => return Ok(None),
        };
        Ok(Some(call))
    }
}

/// Input checks beyond what deserialization enforces.
pub trait Validate {
    /// # Errors
    ///
    /// Returns a `VALIDATION_ERROR` describing the first problem found.
    fn validate(&self) -> Result<(), ToolError>;
}

fn parse_input<T>(tool: &str, input: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned + Validate,
{
    let input = if input.is_null() {
        Value::Object(Map::new())
    } else {
        input
    };
    let request: T = serde_json::from_value(input)
        .map_err(|e| ToolError::validation(format!("Invalid input for {tool}: {e}")))?;
    request.validate()?;
    Ok(request)
}

fn require(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid_field(field, format!("{field} is required")));
    }
    Ok(())
}

fn check_quantity(quantity: u32) -> Result<(), ToolError> {
    if (1..=MAX_CART_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(ToolError::invalid_field(
            "quantity",
            format!("quantity must be between 1 and {MAX_CART_QUANTITY}"),
        ))
    }
}

const fn default_quantity() -> u32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorCode;

    fn parse(name: &str, input: Value) -> Result<ToolCall, ToolError> {
        ToolCall::parse(name, input).map(Option::unwrap)
    }

    #[test]
    fn test_unknown_tool_is_none() {
        assert!(ToolCall::parse("commerce.teleport", json!({})).unwrap().is_none());
    }

    #[test]
    fn test_search_defaults() {
        let ToolCall::SearchProducts(req) = parse(names::SEARCH_PRODUCTS, Value::Null).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(req.query(), None);
        assert_eq!(req.sort_by, SortBy::Relevance);
        assert_eq!(req.page_request(), PageRequest { page: 1, limit: 20 });
    }

    #[test]
    fn test_search_limit_capped_not_rejected() {
        let ToolCall::SearchProducts(req) = parse(
            names::SEARCH_PRODUCTS,
            json!({"query": "tv", "pagination": {"page": 3, "limit": 500}, "sortBy": "price_desc"}),
        )
        .unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(req.page_request(), PageRequest { page: 3, limit: 100 });
        assert_eq!(req.sort_by, SortBy::PriceDesc);
    }

    #[test]
    fn test_search_rejects_page_zero_and_long_query() {
        let err = parse(names::SEARCH_PRODUCTS, json!({"pagination": {"page": 0}})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = parse(names::SEARCH_PRODUCTS, json!({"query": "x".repeat(501)})).unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "query");
    }

    #[test]
    fn test_search_rejects_unknown_sort() {
        let err = parse(names::SEARCH_PRODUCTS, json!({"sortBy": "popularity"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_search_rejects_inverted_price_range() {
        let err = parse(
            names::SEARCH_PRODUCTS,
            json!({"filters": {"priceMin": 500, "priceMax": "100"}}),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_filters_to_canonical_keeps_extra_keys() {
        let filters: SearchFilters = serde_json::from_value(json!({
            "priceMin": 100,
            "categories": ["electronics"],
            "attributes": {"color": "black"}
        }))
        .unwrap();
        let canonical = filters.to_canonical();
        assert_eq!(canonical["priceMin"], "100");
        assert_eq!(canonical["categories"], json!(["electronics"]));
        assert_eq!(canonical["attributes"], json!({"color": "black"}));
        assert!(!canonical.contains_key("brands"));
    }

    #[test]
    fn test_compare_requires_two_ids() {
        let err = parse(names::COMPARE_PRODUCTS, json!({"productIds": ["a"]})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(parse(names::COMPARE_PRODUCTS, json!({"productIds": ["a", "b"]})).is_ok());
    }

    #[test]
    fn test_add_item_quantity_bounds() {
        let base = json!({"userId": "u1", "productId": "p1", "provider": "mock"});
        let ToolCall::AddCartItem(req) = parse(names::CART_ADD_ITEM, base.clone()).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(req.quantity, 1);

        let mut over = base;
        over["quantity"] = json!(100);
        let err = parse(names::CART_ADD_ITEM, over).unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "quantity");
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse(names::CART_GET_CART, json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains(names::CART_GET_CART));

        let err = parse(names::CART_GET_CART, json!({"userId": "  "})).unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "userId");
    }

    #[test]
    fn test_checkout_update_needs_a_change() {
        let id = CheckoutId::generate().to_string();
        let err = parse(names::CHECKOUT_UPDATE, json!({"checkoutId": id, "userId": "u1"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let ok = parse(
            names::CHECKOUT_UPDATE,
            json!({"checkoutId": id, "userId": "u1", "paymentMethod": "UPI"}),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_checkout_update_validates_address() {
        let err = parse(
            names::CHECKOUT_UPDATE,
            json!({
                "checkoutId": CheckoutId::generate().to_string(),
                "userId": "u1",
                "shippingAddress": {"line1": "", "city": "Pune", "pincode": "411001"}
            }),
        )
        .unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "line1");
    }

    #[test]
    fn test_checkout_id_must_be_uuid() {
        let err = parse(names::CHECKOUT_GET, json!({"checkoutId": "abc", "userId": "u1"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_complete_confirmed_defaults_false() {
        let ToolCall::CompleteCheckout(req) = parse(
            names::CHECKOUT_COMPLETE,
            json!({"checkoutId": CheckoutId::generate().to_string(), "userId": "u1"}),
        )
        .unwrap() else {
            panic!("wrong variant");
        };
        assert!(!req.confirmed);
    }
}
