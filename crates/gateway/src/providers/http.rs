//! Remote catalog provider over HTTP.
//!
//! Expects a catalog API that already speaks canonical JSON:
//!
//! - `GET {base}/search?q=..&page=..&limit=..&<filters>` → `{"products": [...]}`
//! - `GET {base}/products/{id}` → product, or 404
//!
//! Search and details only. Cart and order calls fall through to the
//! trait defaults and report the capability as unsupported.

use std::time::Duration;

use async_trait::async_trait;
use bazaar_core::{CanonicalProduct, Capability, ProductId, ProviderId};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{ProviderAdapter, ProviderError};
use crate::mapping::ProviderFilters;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    products: Vec<CanonicalProduct>,
}

/// HTTP catalog backend.
#[derive(Debug, Clone)]
pub struct HttpCatalogProvider {
    id: ProviderId,
    base_url: Url,
    client: reqwest::Client,
}

impl HttpCatalogProvider {
    /// Create a provider rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidInput` for a malformed URL, or
    /// `ProviderError::Http` if the HTTP client cannot be built.
    pub fn new(id: ProviderId, base_url: &str) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::InvalidInput(format!("base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidInput(format!(
                "base URL {base_url} cannot have paths"
            )));
        }
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            id,
            base_url,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::InvalidInput("base URL cannot have paths".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn owned(&self, mut product: CanonicalProduct) -> CanonicalProduct {
        product.provider_id = self.id.clone();
        product
    }
}

/// Flatten provider filters into query pairs.
///
/// Scalars are stringified, lists are comma-joined, nested objects are
/// sent as JSON.
fn filter_pairs(filters: &ProviderFilters) -> Vec<(String, String)> {
    filters
        .as_map()
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(","),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

#[async_trait]
impl ProviderAdapter for HttpCatalogProvider {
    fn name(&self) -> &str {
        self.id.as_str()
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::Search | Capability::Details)
    }

    async fn search(
        &self,
        query: Option<&str>,
        filters: &ProviderFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CanonicalProduct>, ProviderError> {
        let mut params = filter_pairs(filters);
        if let Some(q) = query {
            params.push(("q".to_string(), q.to_string()));
        }
        params.push(("page".to_string(), page.to_string()));
        params.push(("limit".to_string(), limit.to_string()));

        let response = self
            .client
            .get(self.endpoint(&["search"])?)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let payload: SearchPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidPayload(e.to_string()))?;
        Ok(payload.products.into_iter().map(|p| self.owned(p)).collect())
    }

    async fn get_details(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CanonicalProduct>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint(&["products", product_id.as_str()])?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let product: CanonicalProduct = response
            .error_for_status()?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidPayload(e.to_string()))?;
        Ok(Some(self.owned(product)))
    }
}
