//! Backing stores for provider capability records.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::RegistryError;
use super::record::ProviderCapabilitySet;

/// Where the registry loads provider records from.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Load every provider record, enabled or not.
    async fn load(&self) -> Result<Vec<ProviderCapabilitySet>, RegistryError>;
}

/// Top-level shape of the providers file.
#[derive(Debug, Deserialize)]
pub struct ProvidersFile {
    #[serde(default)]
    pub providers: Vec<ProviderCapabilitySet>,
}

impl ProvidersFile {
    /// Parse the YAML providers document.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Parse` if the document is not valid.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        serde_yaml::from_str(raw).map_err(|e| RegistryError::Parse(e.to_string()))
    }
}

/// Reads a YAML providers file on every refresh, so edits take effect
/// once the cache expires.
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
}

impl YamlFileSource {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CapabilitySource for YamlFileSource {
    async fn load(&self) -> Result<Vec<ProviderCapabilitySet>, RegistryError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RegistryError::Io(format!("{}: {e}", self.path.display())))?;
        Ok(ProvidersFile::parse(&raw)?.providers)
    }
}

/// In-memory source. Records can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticSource {
    records: RwLock<Vec<ProviderCapabilitySet>>,
}

impl StaticSource {
    #[must_use]
    pub const fn new(records: Vec<ProviderCapabilitySet>) -> Self {
        Self {
            records: RwLock::const_new(records),
        }
    }

    /// Replace the stored records. Readers see the change after the next refresh.
    pub async fn replace(&self, records: Vec<ProviderCapabilitySet>) {
        *self.records.write().await = records;
    }
}

#[async_trait]
impl CapabilitySource for StaticSource {
    async fn load(&self) -> Result<Vec<ProviderCapabilitySet>, RegistryError> {
        Ok(self.records.read().await.clone())
    }
}
