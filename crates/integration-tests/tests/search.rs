//! Integration tests for federated search.
//!
//! These tests drive `commerce.searchProducts` through the tool dispatcher
//! against fake providers.

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::Capability;
use bazaar_gateway::ErrorCode;
use bazaar_gateway::mapping::ProviderVocabulary;
use bazaar_gateway::providers::CatalogProvider;
use bazaar_gateway::registry::{ProviderCapabilitySet, ToolSettings};
use bazaar_gateway::tools::names;
use bazaar_integration_tests::{
    FailingProvider, Harness, ScriptedProvider, SlowProvider, product,
};
use serde_json::{Value, json};

fn record(id: &str, priority: i32) -> ProviderCapabilitySet {
    let mut record = ProviderCapabilitySet::new(id, [Capability::Search, Capability::Details]);
    record.priority = priority;
    record
}

fn ids(data: &Value) -> Vec<String> {
    data["products"]
        .as_array()
        .expect("products array")
        .iter()
        .map(|p| p["id"].as_str().expect("product id").to_string())
        .collect()
}

fn numbered(provider: &str, prefix: &str, count: usize) -> Vec<bazaar_core::CanonicalProduct> {
    (1..=count)
        .map(|n| {
            let id = format!("{prefix}{n}");
            product(provider, &id, &format!("Item {id}"), Some("Acme"), 100, None)
        })
        .collect()
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_search_succeeds_when_every_provider_fails() {
    let harness = Harness::builder()
        .provider(record("alpha", 1), Arc::new(FailingProvider::new("alpha")))
        .provider(record("beta", 2), Arc::new(FailingProvider::new("beta")))
        .build();

    let response = harness
        .call(names::SEARCH_PRODUCTS, json!({ "query": "phone" }))
        .await;

    assert!(response.ok, "search must not fail: {:?}", response.error);
    let data = response.data.expect("data");
    assert_eq!(data["products"], json!([]));
    assert_eq!(data["total"], 0);
    assert_eq!(data["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn test_search_with_no_providers_is_empty() {
    let harness = Harness::builder().build();
    let data = harness.ok(names::SEARCH_PRODUCTS, Value::Null).await;
    assert_eq!(data["total"], 0);
    assert_eq!(data["providers"], json!([]));
}

#[tokio::test]
async fn test_failing_provider_does_not_hide_others() {
    let harness = Harness::builder()
        .provider(record("broken", 1), Arc::new(FailingProvider::new("broken")))
        .provider(
            record("alpha", 2),
            Arc::new(ScriptedProvider::new("alpha", numbered("alpha", "a", 2))),
        )
        .build();

    let data = harness.ok(names::SEARCH_PRODUCTS, json!({})).await;
    assert_eq!(ids(&data), ["a1", "a2"]);
    assert_eq!(data["providers"], json!(["broken", "alpha"]));
}

#[tokio::test]
async fn test_slow_provider_is_cut_off_by_timeout() {
    let harness = Harness::builder()
        .provider_timeout(Duration::from_millis(100))
        .provider(
            record("fast", 1),
            Arc::new(ScriptedProvider::new("fast", numbered("fast", "f", 1))),
        )
        .provider(
            record("slow", 2),
            Arc::new(SlowProvider::new(
                "slow",
                numbered("slow", "s", 1),
                Duration::from_secs(5),
            )),
        )
        .build();

    let data = harness.ok(names::SEARCH_PRODUCTS, json!({})).await;
    assert_eq!(ids(&data), ["f1"]);
}

// =============================================================================
// Provider Selection
// =============================================================================

#[tokio::test]
async fn test_all_three_gates_must_pass() {
    let serving = Arc::new(ScriptedProvider::new("serving", numbered("serving", "v", 1)));
    let disabled = Arc::new(ScriptedProvider::new("disabled", numbered("disabled", "d", 1)));
    let incapable = Arc::new(ScriptedProvider::new("incapable", numbered("incapable", "i", 1)));
    let switched_off = Arc::new(ScriptedProvider::new("switched", numbered("switched", "o", 1)));

    let mut disabled_record = record("disabled", 2);
    disabled_record.enabled = false;

    let incapable_record = ProviderCapabilitySet::new("incapable", [Capability::Details]);

    let mut switched_record = record("switched", 4);
    switched_record.tools.insert(
        names::SEARCH_PRODUCTS.to_string(),
        ToolSettings {
            enabled: false,
            ..ToolSettings::default()
        },
    );

    let harness = Harness::builder()
        .provider(record("serving", 1), serving.clone())
        .provider(disabled_record, disabled.clone())
        .provider(incapable_record, incapable.clone())
        .provider(switched_record, switched_off.clone())
        .build();

    let data = harness.ok(names::SEARCH_PRODUCTS, json!({})).await;

    assert_eq!(ids(&data), ["v1"]);
    assert_eq!(data["providers"], json!(["serving"]));
    assert_eq!(serving.calls().len(), 1);
    assert!(disabled.calls().is_empty());
    assert!(incapable.calls().is_empty());
    assert!(switched_off.calls().is_empty());
}

#[tokio::test]
async fn test_record_without_adapter_is_skipped() {
    let harness = Harness::builder()
        .record(record("ghost", 1))
        .provider(
            record("alpha", 2),
            Arc::new(ScriptedProvider::new("alpha", numbered("alpha", "a", 1))),
        )
        .build();

    let data = harness.ok(names::SEARCH_PRODUCTS, json!({})).await;
    assert_eq!(ids(&data), ["a1"]);
    assert_eq!(data["providers"], json!(["alpha"]));
}

#[tokio::test]
async fn test_filters_are_mapped_per_provider() {
    let mapped = Arc::new(ScriptedProvider::new("mapped", Vec::new()));
    let plain = Arc::new(ScriptedProvider::new("plain", Vec::new()));

    let mut mapped_record = record("mapped", 1);
    mapped_record
        .field_mappings
        .insert("priceMin".to_string(), "min_price".to_string());
    mapped_record
        .category_mappings
        .insert("electronics.mobiles".to_string(), "mobile-phones".to_string());
    let mut search_override = ToolSettings::default();
    search_override
        .field_mappings
        .insert("brands".to_string(), "brand_names".to_string());
    mapped_record
        .tools
        .insert(names::SEARCH_PRODUCTS.to_string(), search_override);

    let harness = Harness::builder()
        .provider(mapped_record, mapped.clone())
        .provider(record("plain", 2), plain.clone())
        .build();

    harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({
                "query": "galaxy",
                "filters": {
                    "priceMin": "100",
                    "categories": ["electronics.mobiles", "audio"],
                    "brands": ["Samsung"]
                }
            }),
        )
        .await;

    let mapped_calls = mapped.calls();
    assert_eq!(mapped_calls.len(), 1);
    let filters = &mapped_calls[0].filters;
    assert_eq!(filters.get("min_price"), Some(&json!("100")));
    assert_eq!(filters.get("priceMin"), None);
    assert_eq!(filters.get("categories"), Some(&json!(["mobile-phones", "audio"])));
    assert_eq!(filters.get("brand_names"), Some(&json!(["Samsung"])));
    assert_eq!(mapped_calls[0].query.as_deref(), Some("galaxy"));

    let plain_calls = plain.calls();
    let filters = &plain_calls[0].filters;
    assert_eq!(filters.get("priceMin"), Some(&json!("100")));
    assert_eq!(
        filters.get("categories"),
        Some(&json!(["electronics.mobiles", "audio"]))
    );
    assert_eq!(filters.get("brands"), Some(&json!(["Samsung"])));
}

/// A catalog-backed provider whose record renames price keys and a
/// category, laid out like the bundled `meesho` entry.
fn mapped_catalog() -> Harness {
    let mut record = record("meesho", 1);
    record
        .field_mappings
        .insert("priceMin".to_string(), "min_price".to_string());
    record
        .field_mappings
        .insert("priceMax".to_string(), "max_price".to_string());
    record
        .category_mappings
        .insert("electronics.mobiles".to_string(), "mobile-phones".to_string());

    let mut kurti = product("meesho", "M3", "Cotton Kurti", Some("Libas"), 649, None);
    kurti.category = Some("fashion.women".to_string());
    let catalog = CatalogProvider::new(
        "meesho",
        vec![
            product("meesho", "M1", "Galaxy M14", Some("Samsung"), 13_490, Some(4.2)),
            product("meesho", "M2", "Redmi 13C", Some("Xiaomi"), 8_999, Some(4.0)),
            kurti,
        ],
    )
    .with_vocabulary(ProviderVocabulary::for_tool(&record, names::SEARCH_PRODUCTS));

    Harness::builder().provider(record, Arc::new(catalog)).build()
}

#[tokio::test]
async fn test_mapped_price_filter_reaches_catalog() {
    let harness = mapped_catalog();
    let data = harness
        .ok(names::SEARCH_PRODUCTS, json!({ "filters": { "priceMax": 1 } }))
        .await;
    assert_eq!(data["total"], 0);

    let data = harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({ "filters": { "priceMin": "9000", "priceMax": "20000" } }),
        )
        .await;
    assert_eq!(ids(&data), ["M1"]);
}

#[tokio::test]
async fn test_mapped_category_filter_reaches_catalog() {
    let harness = mapped_catalog();
    let data = harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({ "filters": { "categories": ["electronics.mobiles"] } }),
        )
        .await;
    assert_eq!(ids(&data), ["M1", "M2"]);
}

// =============================================================================
// Merge, Dedupe, Sort
// =============================================================================

#[tokio::test]
async fn test_duplicates_across_providers_keep_first_seen() {
    let harness = Harness::builder()
        .provider(
            record("alpha", 1),
            Arc::new(ScriptedProvider::new(
                "alpha",
                vec![product("alpha", "A1", "Galaxy M14", Some("Samsung"), 13_490, Some(4.2))],
            )),
        )
        .provider(
            record("beta", 2),
            Arc::new(ScriptedProvider::new(
                "beta",
                vec![
                    product("beta", "B1", "GALAXY m14", Some("samsung"), 13_299, Some(4.1)),
                    product("beta", "B2", "Redmi 13C", Some("Xiaomi"), 8_999, None),
                ],
            )),
        )
        .build();

    let data = harness.ok(names::SEARCH_PRODUCTS, json!({})).await;
    assert_eq!(ids(&data), ["A1", "B2"]);
    assert_eq!(data["total"], 2);
    assert_eq!(data["products"][0]["providerId"], "alpha");
}

#[tokio::test]
async fn test_price_sorts_are_reverses_of_each_other() {
    let harness = Harness::builder()
        .provider(
            record("alpha", 1),
            Arc::new(ScriptedProvider::new(
                "alpha",
                vec![
                    product("alpha", "A1", "Kettle", None, 1_499, None),
                    product("alpha", "A2", "Toaster", None, 2_199, None),
                ],
            )),
        )
        .provider(
            record("beta", 2),
            Arc::new(ScriptedProvider::new(
                "beta",
                vec![
                    product("beta", "B1", "Mixer", None, 3_250, None),
                    product("beta", "B2", "Iron", None, 899, None),
                ],
            )),
        )
        .build();

    let asc = harness
        .ok(names::SEARCH_PRODUCTS, json!({ "sortBy": "price_asc" }))
        .await;
    let desc = harness
        .ok(names::SEARCH_PRODUCTS, json!({ "sortBy": "price_desc" }))
        .await;

    let asc_ids = ids(&asc);
    let mut desc_ids = ids(&desc);
    desc_ids.reverse();
    assert_eq!(asc_ids, ["B2", "A1", "A2", "B1"]);
    assert_eq!(asc_ids, desc_ids);
}

#[tokio::test]
async fn test_rating_sort_puts_unrated_last() {
    let harness = Harness::builder()
        .provider(
            record("alpha", 1),
            Arc::new(ScriptedProvider::new(
                "alpha",
                vec![
                    product("alpha", "A1", "Unrated", None, 100, None),
                    product("alpha", "A2", "Okay", None, 100, Some(3.5)),
                    product("alpha", "A3", "Great", None, 100, Some(4.8)),
                ],
            )),
        )
        .build();

    let data = harness
        .ok(names::SEARCH_PRODUCTS, json!({ "sortBy": "rating" }))
        .await;
    assert_eq!(ids(&data), ["A3", "A2", "A1"]);
}

// =============================================================================
// Pagination
// =============================================================================

/// Each provider is asked for the caller's page window, and the merged set
/// is then cut with the same window again. Items outside a provider's own
/// window never reach the merge.
#[tokio::test]
async fn test_two_layer_pagination() {
    let alpha = Arc::new(ScriptedProvider::new("alpha", numbered("alpha", "a", 5)));
    let beta = Arc::new(ScriptedProvider::new("beta", numbered("beta", "b", 5)));
    let harness = Harness::builder()
        .provider(record("alpha", 1), alpha.clone())
        .provider(record("beta", 2), beta.clone())
        .build();

    let data = harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({ "pagination": { "page": 2, "limit": 3 } }),
        )
        .await;

    // Provider windows: alpha → a4, a5; beta → b4, b5.
    for calls in [alpha.calls(), beta.calls()] {
        assert_eq!(calls.len(), 1);
        assert_eq!((calls[0].page, calls[0].limit), (2, 3));
    }

    // Merged [a4, a5, b4, b5], then page 2 of size 3 again.
    assert_eq!(data["total"], 4);
    assert_eq!(ids(&data), ["b5"]);
    assert_eq!(data["pagination"]["page"], 2);
    assert_eq!(data["pagination"]["limit"], 3);
    assert_eq!(data["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn test_merged_total_only_counts_provider_windows() {
    let harness = Harness::builder()
        .provider(
            record("alpha", 1),
            Arc::new(ScriptedProvider::new("alpha", numbered("alpha", "a", 4))),
        )
        .build();

    let data = harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({ "pagination": { "page": 1, "limit": 3 } }),
        )
        .await;
    assert_eq!(ids(&data), ["a1", "a2", "a3"]);
    assert_eq!(data["total"], 3);
    assert_eq!(data["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn test_limit_is_capped_not_rejected() {
    let alpha = Arc::new(ScriptedProvider::new("alpha", Vec::new()));
    let harness = Harness::builder()
        .provider(record("alpha", 1), alpha.clone())
        .build();

    let data = harness
        .ok(
            names::SEARCH_PRODUCTS,
            json!({ "pagination": { "limit": 500 } }),
        )
        .await;

    assert_eq!(data["pagination"]["limit"], 100);
    assert_eq!(alpha.calls()[0].limit, 100);
    assert_eq!(alpha.calls()[0].page, 1);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_overlong_query_rejected() {
    let harness = Harness::builder().build();
    let err = harness
        .err(names::SEARCH_PRODUCTS, json!({ "query": "x".repeat(501) }))
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_page_zero_rejected() {
    let harness = Harness::builder().build();
    let err = harness
        .err(
            names::SEARCH_PRODUCTS,
            json!({ "pagination": { "page": 0 } }),
        )
        .await;
    assert_eq!(err.code, ErrorCode::ValidationError);
}
