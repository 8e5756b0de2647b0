//! Side-by-side product comparison.

use bazaar_core::{CanonicalProduct, ProductId};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument};

use super::DetailResolver;
use crate::error::ToolError;
use crate::tools::requests::MIN_COMPARE;

/// Fixed comparison rows, each aligned with the resolved product order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonMatrix {
    pub name: Vec<String>,
    /// `"{currency} {amount}"`.
    pub price: Vec<String>,
    pub brand: Vec<String>,
    /// `"{rating}/5"`.
    pub rating: Vec<String>,
    pub availability: Vec<String>,
}

impl ComparisonMatrix {
    #[must_use]
    pub fn build(products: &[CanonicalProduct]) -> Self {
        let mut matrix = Self::default();
        for p in products {
            matrix.name.push(p.name.clone());
            matrix.price.push(format!("{} {}", p.price.currency, p.price.amount));
            matrix
                .brand
                .push(p.brand.clone().unwrap_or_else(|| "N/A".to_string()));
            matrix
                .rating
                .push(p.rating.map_or_else(|| "N/A".to_string(), |r| format!("{r}/5")));
            matrix.availability.push(
                if p.in_stock() { "In Stock" } else { "Out of Stock" }.to_string(),
            );
        }
        matrix
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub products: Vec<CanonicalProduct>,
    pub comparison_matrix: ComparisonMatrix,
    pub recommendation: String,
}

#[derive(Debug, Clone)]
pub struct CompareService {
    details: DetailResolver,
}

impl CompareService {
    #[must_use]
    pub const fn new(details: DetailResolver) -> Self {
        Self { details }
    }

    /// Resolve every id and compare whatever was found.
    ///
    /// Ids are resolved concurrently; the result keeps request order and
    /// silently drops ids no provider knows.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if fewer than two products resolve.
    #[instrument(skip(self, product_ids), fields(requested = product_ids.len()))]
    pub async fn compare(&self, product_ids: &[ProductId]) -> Result<Comparison, ToolError> {
        let lookups = product_ids.iter().map(|id| self.details.resolve(id));
        let mut products = Vec::with_capacity(product_ids.len());
        for found in join_all(lookups).await {
            if let Some(product) = found? {
                products.push(product);
            }
        }

        if products.len() < MIN_COMPARE {
            return Err(ToolError::not_found("Not enough products found"));
        }

        let comparison_matrix = ComparisonMatrix::build(&products);
        let recommendation = recommend(&products);
        info!(resolved = products.len(), "Comparison built");

        Ok(Comparison {
            products,
            comparison_matrix,
            recommendation,
        })
    }
}

/// Cheapest in-stock product and highest-rated product, picked
/// independently. Each falls back to the first product when nothing qualifies.
#[must_use]
pub fn recommend(products: &[CanonicalProduct]) -> String {
    let Some(first) = products.first() else {
        return String::new();
    };
    let best_value = products
        .iter()
        .filter(|p| p.in_stock())
        .min_by(|a, b| a.price.amount.cmp(&b.price.amount))
        .unwrap_or(first);
    let best_rated = products
        .iter()
        .filter(|p| p.rating.is_some())
        .max_by(|a, b| a.rating.unwrap_or(0.0).total_cmp(&b.rating.unwrap_or(0.0)))
        .unwrap_or(first);

    format!(
        "Best value: {} at {} {}. Highest rated: {} with {:.1} stars.",
        best_value.name,
        best_value.price.currency,
        best_value.price.amount,
        best_rated.name,
        best_rated.rating.unwrap_or(0.0),
    )
}
