//! Federated product search.
//!
//! A search fans out to every provider passing the three gates (enabled,
//! SEARCH capability, tool enabled), each with filters translated into that
//! provider's vocabulary. Results are merged in provider order, de-duplicated,
//! sorted, and paginated a second time over the merged set.
//!
//! Every provider is also asked for the same page and limit, so a provider
//! truncates before the merge. Page 2 of the federated result is page 2 of
//! the union of each provider's page 2, not of the union of everything.

use std::cmp::Ordering;
use std::collections::HashSet;

use bazaar_core::{CanonicalProduct, Capability, ProviderId};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::Federation;
use crate::error::ToolError;
use crate::mapping::FieldMapper;
use crate::tools::definitions::names;
use crate::tools::requests::{PageRequest, SearchRequest, SortBy};

/// Page metadata over the merged set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub products: Vec<CanonicalProduct>,
    /// Size of the merged, de-duplicated set before the final page cut.
    pub total: usize,
    pub pagination: PageInfo,
    /// Providers that were asked, in merge order.
    pub providers: Vec<ProviderId>,
}

#[derive(Debug, Clone)]
pub struct SearchService {
    federation: Federation,
}

impl SearchService {
    #[must_use]
    pub const fn new(federation: Federation) -> Self {
        Self { federation }
    }

    /// Run a federated search.
    ///
    /// Provider failures and timeouts contribute nothing and never fail the
    /// call.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL_ERROR` only if the provider records cannot be loaded.
    #[instrument(skip(self, request), fields(query = ?request.query(), sort = ?request.sort_by))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, ToolError> {
        let window = request.page_request();
        let snapshot = self.federation.snapshot().await?;
        let canonical_filters = request.filters.to_canonical();

        let mut calls = Vec::new();
        let mut asked = Vec::new();
        for record in snapshot.serving(names::SEARCH_PRODUCTS, Capability::Search) {
            let Some(adapter) = self
                .federation
                .providers()
                .capable(&record.id, Capability::Search)
            else {
                debug!(provider_id = %record.id, "No SEARCH adapter registered, skipping");
                continue;
            };

            let filters = FieldMapper::new(record, names::SEARCH_PRODUCTS).filters(&canonical_filters);
            let query = request.query();
            let provider_id = record.id.clone();
            asked.push(provider_id.clone());

            calls.push(async move {
                let outcome = self
                    .federation
                    .bounded(adapter.search(query, &filters, window.page, window.limit))
                    .await;
                match outcome {
                    Ok(products) => {
                        debug!(provider_id = %provider_id, count = products.len(), "Provider answered");
                        products
                    }
                    Err(e) => {
                        warn!(provider_id = %provider_id, error = %e, "Provider search failed");
                        Vec::new()
                    }
                }
            });
        }

        let merged: Vec<CanonicalProduct> = join_all(calls).await.into_iter().flatten().collect();
        let fetched = merged.len();

        let mut unique = dedupe(merged);
        sort_products(&mut unique, request.sort_by);
        let total = unique.len();
        let (products, has_more) = paginate(unique, window);

        info!(
            providers = asked.len(),
            fetched,
            total,
            returned = products.len(),
            "Search complete"
        );

        Ok(SearchResults {
            products,
            total,
            pagination: PageInfo {
                page: window.page,
                limit: window.limit,
                total,
                has_more,
            },
            providers: asked,
        })
    }
}

/// Drop later products sharing a [`dedup_key`](CanonicalProduct::dedup_key)
/// with an earlier one. Order is otherwise kept.
#[must_use]
pub fn dedupe(products: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
    let mut seen = HashSet::with_capacity(products.len());
    products
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

/// Sort in place. `Relevance` leaves the order alone; all sorts are stable.
pub fn sort_products(products: &mut [CanonicalProduct], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => {}
        SortBy::PriceAsc => products.sort_by(|a, b| a.price.amount.cmp(&b.price.amount)),
        SortBy::PriceDesc => products.sort_by(|a, b| b.price.amount.cmp(&a.price.amount)),
        SortBy::Rating => products.sort_by(|a, b| rating_desc(a.rating, b.rating)),
    }
}

fn rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cut one page out of the merged set. A page past the end is empty.
///
/// Returns the page and whether more items follow it.
#[must_use]
pub fn paginate(products: Vec<CanonicalProduct>, window: PageRequest) -> (Vec<CanonicalProduct>, bool) {
    let limit = window.limit as usize;
    let start = (window.page.saturating_sub(1) as usize).saturating_mul(limit);
    let end = start.saturating_add(limit).min(products.len());
    let has_more = end < products.len();
    let page = products.into_iter().skip(start).take(limit).collect();
    (page, has_more)
}
