//! Canonical → provider vocabulary translation.
//!
//! Lookups go tool-level table, then provider-level table, then identity.
//! Translation is outbound only; provider responses arrive already in
//! canonical shape.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::registry::ProviderCapabilitySet;

/// Filter key whose list values are category names.
pub const CATEGORIES_FIELD: &str = "categories";

/// Translator for one (provider, tool) pair.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper<'a> {
    provider: &'a ProviderCapabilitySet,
    tool: &'a str,
}

impl<'a> FieldMapper<'a> {
    #[must_use]
    pub const fn new(provider: &'a ProviderCapabilitySet, tool: &'a str) -> Self {
        Self { provider, tool }
    }

    /// Provider name for a canonical field.
    #[must_use]
    pub fn field<'k>(&self, canonical: &'k str) -> &'k str
    where
        'a: 'k,
    {
        self.provider
            .tool(self.tool)
            .and_then(|t| t.field_mappings.get(canonical))
            .or_else(|| self.provider.field_mappings.get(canonical))
            .map_or(canonical, String::as_str)
    }

    /// Provider name for a canonical category.
    #[must_use]
    pub fn category<'k>(&self, canonical: &'k str) -> &'k str
    where
        'a: 'k,
    {
        self.provider
            .tool(self.tool)
            .and_then(|t| t.category_mappings.get(canonical))
            .or_else(|| self.provider.category_mappings.get(canonical))
            .map_or(canonical, String::as_str)
    }

    /// Translate a canonical filter object.
    ///
    /// Keys are renamed at every nesting level. The `categories` list is
    /// translated element by element through the category table. Other
    /// values pass through untouched.
    #[must_use]
    pub fn filters(&self, canonical: &Map<String, Value>) -> ProviderFilters {
        ProviderFilters(self.map_object(canonical))
    }

    fn map_object(&self, object: &Map<String, Value>) -> Map<String, Value> {
        object
            .iter()
            .map(|(key, value)| {
                let mapped = match value {
                    Value::Object(nested) => Value::Object(self.map_object(nested)),
                    Value::Array(items) if key == CATEGORIES_FIELD => Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::String(c) => Value::String(self.category(c).to_string()),
                                other => other.clone(),
                            })
                            .collect(),
                    ),
                    other => other.clone(),
                };
                (self.field(key).to_string(), mapped)
            })
            .collect()
    }
}

/// Filters in one provider's vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProviderFilters(Map<String, Value>);

impl ProviderFilters {
    #[must_use]
    pub const fn new(filters: Map<String, Value>) -> Self {
        Self(filters)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A numeric filter, accepting JSON numbers or decimal strings.
    #[must_use]
    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        match self.0.get(key)? {
            Value::String(s) => Decimal::from_str(s).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            _ => None,
        }
    }

    /// A list-of-strings filter. A bare string counts as a one-element list.
    #[must_use]
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// The receiving side of one (provider, tool) translation.
///
/// An adapter that holds canonical data but is sent filters in its own
/// vocabulary uses this to find the keys it was sent and to turn category
/// names back into canonical ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderVocabulary {
    /// Canonical field → provider field.
    fields: BTreeMap<String, String>,
    /// Provider category → canonical category.
    categories: BTreeMap<String, String>,
}

impl ProviderVocabulary {
    /// Vocabulary for `tool` on `provider`, tool table over provider table.
    #[must_use]
    pub fn for_tool(provider: &ProviderCapabilitySet, tool: &str) -> Self {
        let settings = provider.tool(tool);

        let mut fields = provider.field_mappings.clone();
        let mut categories: BTreeMap<String, String> = provider
            .category_mappings
            .iter()
            .map(|(canonical, theirs)| (theirs.clone(), canonical.clone()))
            .collect();
        if let Some(settings) = settings {
            fields.extend(settings.field_mappings.clone());
            categories.extend(
                settings
                    .category_mappings
                    .iter()
                    .map(|(canonical, theirs)| (theirs.clone(), canonical.clone())),
            );
        }

        Self { fields, categories }
    }

    /// Key under which a canonical field arrives.
    #[must_use]
    pub fn field<'k>(&'k self, canonical: &'k str) -> &'k str {
        self.fields.get(canonical).map_or(canonical, String::as_str)
    }

    /// Canonical name for a category as the provider received it.
    #[must_use]
    pub fn canonical_category<'k>(&'k self, theirs: &'k str) -> &'k str {
        self.categories.get(theirs).map_or(theirs, String::as_str)
    }
}
