//! Integration tests for the checkout workflow and order lookup.

use std::str::FromStr;
use std::sync::Arc;

use bazaar_core::{Capability, CheckoutId, UserId};
use bazaar_gateway::ErrorCode;
use bazaar_gateway::providers::CatalogProvider;
use bazaar_gateway::registry::ProviderCapabilitySet;
use bazaar_gateway::tools::names;
use bazaar_integration_tests::{Harness, address_json, amount, product};
use rust_decimal::Decimal;
use serde_json::{Value, json};

const USER: &str = "u1";
const CART: &str = "CART-u1";

fn harness() -> Harness {
    let record = ProviderCapabilitySet::new(
        "kirana",
        [
            Capability::Search,
            Capability::Details,
            Capability::Cart,
            Capability::Order,
        ],
    );
    Harness::builder()
        .provider(
            record,
            Arc::new(CatalogProvider::new(
                "kirana",
                vec![
                    product("kirana", "K1", "Kettle", Some("Prestige"), 1_000, Some(4.1)),
                    product("kirana", "TV1", "OLED TV", Some("Sony"), 45_000, Some(4.6)),
                ],
            )),
        )
        .build()
}

async fn add(harness: &Harness, product_id: &str, quantity: u32) {
    harness
        .ok(
            names::CART_ADD_ITEM,
            json!({
                "userId": USER,
                "productId": product_id,
                "provider": "kirana",
                "quantity": quantity
            }),
        )
        .await;
}

async fn create(harness: &Harness) -> Value {
    harness
        .ok(
            names::CHECKOUT_CREATE,
            json!({ "userId": USER, "cartId": CART }),
        )
        .await
}

async fn ready_to_complete(harness: &Harness, checkout_id: &Value) -> Value {
    harness
        .ok(
            names::CHECKOUT_UPDATE,
            json!({
                "checkoutId": checkout_id,
                "userId": USER,
                "shippingAddress": address_json("560001"),
                "paymentMethod": "UPI"
            }),
        )
        .await
}

fn assert_total_invariant(view: &Value) {
    let expected = amount(&view["subtotal"]) + amount(&view["tax"]) + amount(&view["shippingCost"])
        - amount(&view["discount"]);
    assert_eq!(amount(&view["total"]), expected);
}

fn checkout_id(view: &Value) -> CheckoutId {
    let raw = view["checkoutId"].as_str().expect("checkoutId");
    CheckoutId::from_str(raw).expect("checkout id parses")
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn test_full_checkout_flow() {
    let harness = harness();
    add(&harness, "K1", 2).await;

    let created = create(&harness).await;
    assert_eq!(created["status"], "CREATED");
    assert_eq!(created["providerId"], "kirana");
    assert_eq!(amount(&created["subtotal"]), Decimal::from(2_000));
    assert_eq!(amount(&created["tax"]), Decimal::from(360));
    assert_eq!(amount(&created["shippingCost"]), Decimal::ZERO);
    assert_total_invariant(&created);

    let id = created["checkoutId"].clone();
    let shipped = harness
        .ok(
            names::CHECKOUT_UPDATE,
            json!({
                "checkoutId": id,
                "userId": USER,
                "shippingAddress": address_json("560001")
            }),
        )
        .await;
    assert_eq!(shipped["status"], "SHIPPING_SET");
    assert_eq!(amount(&shipped["shippingCost"]), Decimal::from(70));
    assert_total_invariant(&shipped);

    let paid = harness
        .ok(
            names::CHECKOUT_UPDATE,
            json!({ "checkoutId": id, "userId": USER, "paymentMethod": "COD" }),
        )
        .await;
    assert_eq!(paid["status"], "PAYMENT_SET");
    assert_eq!(paid["paymentMethod"], "COD");
    assert_eq!(amount(&paid["total"]), Decimal::from(2_430));
    assert_total_invariant(&paid);

    let done = harness
        .ok(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(amount(&done["total"]), Decimal::from(2_430));
    assert_eq!(harness.store.order_count().await, 1);

    let order = harness
        .ok(
            names::ORDER_GET_STATUS,
            json!({ "orderId": done["orderId"], "userId": USER }),
        )
        .await;
    assert_eq!(order["orderId"], done["orderId"]);
    assert_eq!(order["checkoutId"], id);
    assert_eq!(order["paymentMethod"], "COD");
}

#[tokio::test]
async fn test_update_applies_address_and_payment_together() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let created = create(&harness).await;

    let view = ready_to_complete(&harness, &created["checkoutId"]).await;
    assert_eq!(view["status"], "PAYMENT_SET");
    assert_eq!(view["shippingAddress"]["pincode"], "560001");
    assert!(view["version"].as_i64() > created["version"].as_i64());
}

#[tokio::test]
async fn test_get_returns_current_session() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let created = create(&harness).await;

    let fetched = harness
        .ok(
            names::CHECKOUT_GET,
            json!({ "checkoutId": created["checkoutId"], "userId": USER }),
        )
        .await;
    assert_eq!(fetched["checkoutId"], created["checkoutId"]);
    assert_eq!(fetched["items"].as_array().map(Vec::len), Some(1));
}

// =============================================================================
// Completion Rules
// =============================================================================

#[tokio::test]
async fn test_high_value_order_needs_confirmation() {
    let harness = harness();
    add(&harness, "TV1", 1).await;
    let created = create(&harness).await;
    let id = created["checkoutId"].clone();
    ready_to_complete(&harness, &id).await;

    let pending = harness
        .ok(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(pending["requiresConfirmation"], true);
    assert_eq!(pending["message"], "High-value order requires confirmation");
    assert!(amount(&pending["total"]) > Decimal::from(50_000));
    assert_eq!(harness.store.order_count().await, 0);

    let unchanged = harness
        .ok(
            names::CHECKOUT_GET,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(unchanged["status"], "PAYMENT_SET");

    let done = harness
        .ok(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER, "confirmed": true }),
        )
        .await;
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(harness.store.order_count().await, 1);
}

#[tokio::test]
async fn test_complete_requires_shipping_and_payment() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let created = create(&harness).await;

    let err = harness
        .err(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": created["checkoutId"], "userId": USER }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.message, "Shipping address required");
}

#[tokio::test]
async fn test_completed_checkout_cannot_complete_twice() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let id = create(&harness).await["checkoutId"].clone();
    ready_to_complete(&harness, &id).await;
    harness
        .ok(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;

    let err = harness
        .err(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.message, "Checkout already completed");
    assert_eq!(harness.store.order_count().await, 1);
}

// =============================================================================
// Expiry & Cancellation
// =============================================================================

#[tokio::test]
async fn test_overdue_session_reads_expired() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let created = create(&harness).await;
    let id = created["checkoutId"].clone();
    ready_to_complete(&harness, &id).await;

    harness
        .backdate_checkout(checkout_id(&created), &UserId::new(USER))
        .await;

    let view = harness
        .ok(
            names::CHECKOUT_GET,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(view["status"], "EXPIRED");

    let err = harness
        .err(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.message, "Checkout session expired");
    assert_eq!(harness.store.order_count().await, 0);
}

#[tokio::test]
async fn test_cancel_open_session() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let id = create(&harness).await["checkoutId"].clone();

    let cancelled = harness
        .ok(
            names::CHECKOUT_CANCEL,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let err = harness
        .err(
            names::CHECKOUT_UPDATE,
            json!({ "checkoutId": id, "userId": USER, "paymentMethod": "CARD" }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.message, "Checkout was cancelled");
}

#[tokio::test]
async fn test_cancel_completed_session_is_not_found() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let id = create(&harness).await["checkoutId"].clone();
    ready_to_complete(&harness, &id).await;
    harness
        .ok(
            names::CHECKOUT_COMPLETE,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;

    let err = harness
        .err(
            names::CHECKOUT_CANCEL,
            json!({ "checkoutId": id, "userId": USER }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(
        err.message,
        "Checkout not found or already completed/cancelled"
    );
}

// =============================================================================
// Lookup Failures
// =============================================================================

#[tokio::test]
async fn test_create_from_empty_cart() {
    let harness = harness();
    let err = harness
        .err(
            names::CHECKOUT_CREATE,
            json!({ "userId": USER, "cartId": CART }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.message, "Cart is empty");
}

#[tokio::test]
async fn test_create_from_wrong_cart_id() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let err = harness
        .err(
            names::CHECKOUT_CREATE,
            json!({ "userId": USER, "cartId": "CART-someone-else" }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "Cart not found");
}

#[tokio::test]
async fn test_session_is_scoped_to_its_user() {
    let harness = harness();
    add(&harness, "K1", 1).await;
    let id = create(&harness).await["checkoutId"].clone();

    let err = harness
        .err(
            names::CHECKOUT_GET,
            json!({ "checkoutId": id, "userId": "intruder" }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, "Checkout session not found");
}

#[tokio::test]
async fn test_unknown_order() {
    let harness = harness();
    let order_id = "7c9e6679-7425-40de-944b-e07fc1f90ae7";
    let err = harness
        .err(
            names::ORDER_GET_STATUS,
            json!({ "orderId": order_id, "userId": USER }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.message, format!("Order not found: {order_id}"));
}

// =============================================================================
// Shipping Estimate
// =============================================================================

#[tokio::test]
async fn test_shipping_estimate_metro_and_standard() {
    let harness = harness();

    let metro = harness
        .ok(
            names::ESTIMATE_SHIPPING,
            json!({ "productId": "K1", "address": { "pincode": "560001" }, "quantity": 3 }),
        )
        .await;
    assert_eq!(amount(&metro["shippingCost"]), Decimal::from(90));
    assert_eq!(metro["estimatedDeliveryDays"], 2);
    assert_eq!(metro["productId"], "K1");

    let rural = harness
        .ok(
            names::ESTIMATE_SHIPPING,
            json!({ "address": { "pincode": "682001" } }),
        )
        .await;
    assert_eq!(amount(&rural["shippingCost"]), Decimal::from(50));
    assert_eq!(rural["estimatedDeliveryDays"], 5);
}
