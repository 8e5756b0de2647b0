//! Per-provider capability record.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use bazaar_core::{Capability, ProviderId};
use serde::{Deserialize, Deserializer, Serialize};

/// Everything the gateway knows about one provider's configuration.
///
/// Loaded from the backing config store and cached by
/// [`CapabilityRegistry`](super::CapabilityRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilitySet {
    pub id: ProviderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lower runs first. Ties break on provider id.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, deserialize_with = "deserialize_capabilities")]
    pub capabilities: BTreeSet<Capability>,
    /// Per-tool overrides. A tool with no entry is enabled.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolSettings>,
    /// Provider-wide canonical → provider field names.
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    /// Provider-wide canonical → provider category names.
    #[serde(default)]
    pub category_mappings: BTreeMap<String, String>,
    /// How to reach the provider. Only read when adapters are built.
    #[serde(default, skip_serializing)]
    pub backend: Option<BackendConfig>,
}

/// Tool-level overrides for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub category_mappings: BTreeMap<String, String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            field_mappings: BTreeMap::new(),
            category_mappings: BTreeMap::new(),
        }
    }
}

/// Adapter construction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process catalog loaded from a JSON file of canonical products.
    #[serde(rename_all = "camelCase")]
    Catalog { catalog_file: PathBuf },
    /// Remote catalog API.
    #[serde(rename_all = "camelCase")]
    Http { base_url: String },
}

const fn default_true() -> bool {
    true
}

/// Capabilities are matched case-insensitively (`search`, `SEARCH`).
fn deserialize_capabilities<'de, D>(deserializer: D) -> Result<BTreeSet<Capability>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| s.parse::<Capability>().map_err(serde::de::Error::custom))
        .collect()
}

impl ProviderCapabilitySet {
    /// A record with no mappings, enabled, at priority 0.
    #[must_use]
    pub fn new(id: impl Into<ProviderId>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            enabled: true,
            priority: 0,
            capabilities: capabilities.into_iter().collect(),
            tools: BTreeMap::new(),
            field_mappings: BTreeMap::new(),
            category_mappings: BTreeMap::new(),
            backend: None,
        }
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Opt-out model: a tool is enabled unless an override disables it.
    #[must_use]
    pub fn is_tool_enabled(&self, tool: &str) -> bool {
        self.tools.get(tool).is_none_or(|t| t.enabled)
    }

    /// The three eligibility gates: enabled, capable, tool not switched off.
    #[must_use]
    pub fn serves(&self, tool: &str, capability: Capability) -> bool {
        self.enabled && self.supports(capability) && self.is_tool_enabled(tool)
    }

    #[must_use]
    pub fn tool(&self, tool: &str) -> Option<&ToolSettings> {
        self.tools.get(tool)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const YAML: &str = r"
id: acme
displayName: Acme Mart
priority: 2
capabilities: [search, Details, CART]
tools:
  commerce.searchProducts:
    fieldMappings:
      priceMin: min_price
  commerce.compareProducts:
    enabled: false
categoryMappings:
  electronics: tech
backend:
  kind: http
  baseUrl: https://acme.example/api
";

    #[test]
    fn test_record_parses_from_yaml() {
        let record: ProviderCapabilitySet = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(record.id, ProviderId::new("acme"));
        assert_eq!(record.name(), "Acme Mart");
        assert!(record.enabled);
        assert!(record.supports(Capability::Search));
        assert!(record.supports(Capability::Cart));
        assert!(!record.supports(Capability::Order));
        assert_eq!(
            record.backend,
            Some(BackendConfig::Http {
                base_url: "https://acme.example/api".to_string()
            })
        );
        let search = record.tool("commerce.searchProducts").unwrap();
        assert!(search.enabled);
        assert_eq!(search.field_mappings.get("priceMin").unwrap(), "min_price");
    }

    #[test]
    fn test_unknown_capability_rejected() {
        let err = serde_yaml::from_str::<ProviderCapabilitySet>("id: x\ncapabilities: [teleport]");
        assert!(err.is_err());
    }

    #[test]
    fn test_tool_enabled_by_default() {
        let record: ProviderCapabilitySet = serde_yaml::from_str(YAML).unwrap();
        assert!(record.is_tool_enabled("commerce.searchProducts"));
        assert!(record.is_tool_enabled("commerce.cart.addItem"));
        assert!(!record.is_tool_enabled("commerce.compareProducts"));
    }

    #[test]
    fn test_serves_requires_all_three_gates() {
        let mut record = ProviderCapabilitySet::new("p", [Capability::Search]);
        assert!(record.serves("commerce.searchProducts", Capability::Search));
        assert!(!record.serves("commerce.searchProducts", Capability::Details));

        record.tools.insert(
            "commerce.searchProducts".to_string(),
            ToolSettings {
                enabled: false,
                ..ToolSettings::default()
            },
        );
        assert!(!record.serves("commerce.searchProducts", Capability::Search));

        record.tools.clear();
        record.enabled = false;
        assert!(!record.serves("commerce.searchProducts", Capability::Search));
    }
}
