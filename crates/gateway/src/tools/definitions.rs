//! Tool catalogue.
//!
//! Names, descriptions and JSON input schemas for every tool the gateway
//! exposes. `utility.getTools` returns this list verbatim.

use bazaar_core::Capability;
use serde::Serialize;
use serde_json::json;

/// Tool names as they appear on the wire.
pub mod names {
    pub const SEARCH_PRODUCTS: &str = "commerce.searchProducts";
    pub const GET_PRODUCT_DETAILS: &str = "commerce.getProductDetails";
    pub const COMPARE_PRODUCTS: &str = "commerce.compareProducts";
    pub const ESTIMATE_SHIPPING: &str = "commerce.product.estimateShipping";

    pub const CART_ADD_ITEM: &str = "commerce.cart.addItem";
    pub const CART_UPDATE_ITEM_QTY: &str = "commerce.cart.updateItemQty";
    pub const CART_REMOVE_ITEM: &str = "commerce.cart.removeItem";
    pub const CART_GET_CART: &str = "commerce.cart.getCart";

    pub const CHECKOUT_CREATE: &str = "commerce.checkout.create";
    pub const CHECKOUT_UPDATE: &str = "commerce.checkout.update";
    pub const CHECKOUT_GET: &str = "commerce.checkout.get";
    pub const CHECKOUT_COMPLETE: &str = "commerce.checkout.complete";
    pub const CHECKOUT_CANCEL: &str = "commerce.checkout.cancel";

    pub const ORDER_GET_STATUS: &str = "commerce.order.getStatus";

    pub const GET_PROVIDERS: &str = "utility.getProviders";
    pub const GET_PROVIDER_TOOLS: &str = "utility.getProviderTools";
    pub const GET_TOOLS: &str = "utility.getTools";
}

/// A tool the gateway can dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: serde_json::Value,
    pub domain: String,
    /// Provider capability the tool fans out to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<Capability>,
}

/// Every tool, grouped by domain.
#[must_use]
pub fn all_tools() -> Vec<Tool> {
    let mut tools = Vec::with_capacity(17);
    tools.extend(commerce_tools());
    tools.extend(cart_tools());
    tools.extend(checkout_tools());
    tools.extend(utility_tools());
    tools
}

/// Get a tool by name.
#[must_use]
pub fn get_tool_by_name(name: &str) -> Option<Tool> {
    all_tools().into_iter().find(|t| t.name == name)
}

/// Capability gate for a tool; `None` for gateway-local tools.
#[must_use]
pub fn tool_capability(name: &str) -> Option<Capability> {
    get_tool_by_name(name).and_then(|t| t.capability)
}

fn tool(
    name: &str,
    description: &str,
    input_schema: serde_json::Value,
    domain: &str,
    capability: Option<Capability>,
) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
        domain: domain.to_string(),
        capability,
    }
}

fn commerce_tools() -> Vec<Tool> {
    vec![
        tool(
            names::SEARCH_PRODUCTS,
            "Search products across every enabled provider. Results are merged, \
             de-duplicated by name, brand and category, optionally sorted, then paginated.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text query, at most 500 characters",
                        "maxLength": 500
                    },
                    "filters": {
                        "type": "object",
                        "properties": {
                            "priceMin": { "type": "number", "minimum": 0 },
                            "priceMax": { "type": "number", "minimum": 0 },
                            "categories": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Canonical category paths (e.g. 'electronics.mobiles')"
                            },
                            "brands": { "type": "array", "items": { "type": "string" } },
                            "inStock": { "type": "boolean" }
                        }
                    },
                    "pagination": {
                        "type": "object",
                        "properties": {
                            "page": { "type": "integer", "minimum": 1, "default": 1 },
                            "limit": {
                                "type": "integer",
                                "minimum": 1,
                                "maximum": 100,
                                "default": 20
                            }
                        }
                    },
                    "sortBy": {
                        "type": "string",
                        "enum": ["relevance", "price_asc", "price_desc", "rating"],
                        "default": "relevance"
                    }
                }
            }),
            "commerce",
            Some(Capability::Search),
        ),
        tool(
            names::GET_PRODUCT_DETAILS,
            "Get full details for one product. Providers are asked in priority order \
             and the first match wins.",
            json!({
                "type": "object",
                "properties": {
                    "productId": { "type": "string" },
                    "provider": {
                        "type": "string",
                        "description": "Only ask this provider"
                    }
                },
                "required": ["productId"]
            }),
            "commerce",
            Some(Capability::Details),
        ),
        tool(
            names::COMPARE_PRODUCTS,
            "Compare 2 to 10 products side by side and recommend the best value \
             and the highest rated.",
            json!({
                "type": "object",
                "properties": {
                    "productIds": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 2,
                        "maxItems": 10
                    }
                },
                "required": ["productIds"]
            }),
            "commerce",
            Some(Capability::Details),
        ),
        tool(
            names::ESTIMATE_SHIPPING,
            "Estimate shipping cost and delivery date to a pincode.",
            json!({
                "type": "object",
                "properties": {
                    "productId": { "type": "string" },
                    "address": {
                        "type": "object",
                        "properties": { "pincode": { "type": "string" } },
                        "required": ["pincode"]
                    },
                    "quantity": { "type": "integer", "minimum": 1, "maximum": 99, "default": 1 }
                },
                "required": ["address"]
            }),
            "commerce",
            None,
        ),
    ]
}

fn cart_tools() -> Vec<Tool> {
    let item = json!({
        "type": "object",
        "properties": {
            "userId": { "type": "string" },
            "productId": { "type": "string" },
            "quantity": { "type": "integer", "minimum": 1, "maximum": 99 }
        },
        "required": ["userId", "productId", "quantity"]
    });

    let mut add_item = item.clone();
    add_item["properties"]["provider"] = json!({
        "type": "string",
        "description": "Provider whose cart receives the item"
    });
    add_item["properties"]["quantity"]["default"] = json!(1);
    add_item["required"] = json!(["userId", "productId", "provider"]);

    vec![
        tool(
            names::CART_ADD_ITEM,
            "Add a product to the user's cart at the named provider.",
            add_item,
            "cart",
            Some(Capability::Cart),
        ),
        tool(
            names::CART_UPDATE_ITEM_QTY,
            "Set the quantity of an item already in the user's cart.",
            item,
            "cart",
            Some(Capability::Cart),
        ),
        tool(
            names::CART_REMOVE_ITEM,
            "Remove an item from the user's cart.",
            json!({
                "type": "object",
                "properties": {
                    "userId": { "type": "string" },
                    "productId": { "type": "string" }
                },
                "required": ["userId", "productId"]
            }),
            "cart",
            Some(Capability::Cart),
        ),
        tool(
            names::CART_GET_CART,
            "Get the user's cart with recomputed totals.",
            json!({
                "type": "object",
                "properties": { "userId": { "type": "string" } },
                "required": ["userId"]
            }),
            "cart",
            Some(Capability::Cart),
        ),
    ]
}

fn checkout_tools() -> Vec<Tool> {
    let address = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "phone": { "type": "string" },
            "line1": { "type": "string" },
            "line2": { "type": "string" },
            "city": { "type": "string" },
            "state": { "type": "string" },
            "pincode": { "type": "string" },
            "country": { "type": "string", "default": "IN" }
        },
        "required": ["line1", "city", "pincode"]
    });
    let session_ref = json!({
        "type": "object",
        "properties": {
            "checkoutId": { "type": "string", "format": "uuid" },
            "userId": { "type": "string" }
        },
        "required": ["checkoutId", "userId"]
    });

    vec![
        tool(
            names::CHECKOUT_CREATE,
            "Open a checkout session from the user's cart. Prices are frozen into the session.",
            json!({
                "type": "object",
                "properties": {
                    "userId": { "type": "string" },
                    "cartId": { "type": "string" },
                    "provider": { "type": "string" }
                },
                "required": ["userId", "cartId"]
            }),
            "checkout",
            Some(Capability::Cart),
        ),
        tool(
            names::CHECKOUT_UPDATE,
            "Set the shipping address, billing address or payment method of an open checkout.",
            json!({
                "type": "object",
                "properties": {
                    "checkoutId": { "type": "string", "format": "uuid" },
                    "userId": { "type": "string" },
                    "shippingAddress": address,
                    "billingAddress": address,
                    "paymentMethod": { "type": "string", "enum": ["COD", "CARD", "UPI", "WALLET"] }
                },
                "required": ["checkoutId", "userId"]
            }),
            "checkout",
            None,
        ),
        tool(
            names::CHECKOUT_GET,
            "Get a checkout session.",
            session_ref.clone(),
            "checkout",
            None,
        ),
        tool(
            names::CHECKOUT_COMPLETE,
            "Complete a checkout and create exactly one order. Totals above the \
             high-value threshold need confirmed=true.",
            json!({
                "type": "object",
                "properties": {
                    "checkoutId": { "type": "string", "format": "uuid" },
                    "userId": { "type": "string" },
                    "confirmed": { "type": "boolean", "default": false }
                },
                "required": ["checkoutId", "userId"]
            }),
            "checkout",
            None,
        ),
        tool(
            names::CHECKOUT_CANCEL,
            "Cancel an open checkout.",
            session_ref,
            "checkout",
            None,
        ),
        tool(
            names::ORDER_GET_STATUS,
            "Get the status of an order placed through checkout.",
            json!({
                "type": "object",
                "properties": {
                    "orderId": { "type": "string", "format": "uuid" },
                    "userId": { "type": "string" }
                },
                "required": ["orderId", "userId"]
            }),
            "checkout",
            None,
        ),
    ]
}

fn utility_tools() -> Vec<Tool> {
    vec![
        tool(
            names::GET_PROVIDERS,
            "List providers with their capabilities, priority and enabled state.",
            json!({ "type": "object", "properties": {} }),
            "utility",
            None,
        ),
        tool(
            names::GET_PROVIDER_TOOLS,
            "Show one provider's capabilities and per-tool configuration.",
            json!({
                "type": "object",
                "properties": { "providerId": { "type": "string" } },
                "required": ["providerId"]
            }),
            "utility",
            None,
        ),
        tool(
            names::GET_TOOLS,
            "List every tool with its input schema.",
            json!({ "type": "object", "properties": {} }),
            "utility",
            None,
        ),
    ]
}
