//! Capability registry.
//!
//! Holds the provider records that decide which providers a tool may reach
//! and how canonical vocabulary is translated for them. Records are loaded
//! from a [`CapabilitySource`] and cached for a fixed TTL (60s by default).
//!
//! A refresh that fails keeps serving the last good snapshot. Concurrent
//! refreshes collapse into one load through the moka cache.

mod record;
mod source;

pub use record::{BackendConfig, ProviderCapabilitySet, ToolSettings};
pub use source::{CapabilitySource, ProvidersFile, StaticSource, YamlFileSource};

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{Capability, ProviderId};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Errors raised while loading provider records.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("failed to read provider records: {0}")]
    Io(String),
    #[error("invalid provider records: {0}")]
    Parse(String),
    #[error("provider record source unavailable: {0}")]
    Unavailable(String),
}

/// One consistent view of every provider record.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Sorted by priority, then id.
    pub providers: Vec<ProviderCapabilitySet>,
    pub loaded_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    fn new(mut providers: Vec<ProviderCapabilitySet>) -> Self {
        providers.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        Self {
            providers,
            loaded_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<&ProviderCapabilitySet> {
        self.providers.iter().find(|p| &p.id == id)
    }

    /// Providers passing all three gates for `tool`, in priority order.
    pub fn serving<'a>(
        &'a self,
        tool: &'a str,
        capability: Capability,
    ) -> impl Iterator<Item = &'a ProviderCapabilitySet> + 'a {
        self.providers
            .iter()
            .filter(move |p| p.serves(tool, capability))
    }

    /// Enabled providers advertising `capability`, ignoring tool overrides.
    pub fn enabled_with(
        &self,
        capability: Capability,
    ) -> impl Iterator<Item = &ProviderCapabilitySet> {
        self.providers
            .iter()
            .filter(move |p| p.enabled && p.supports(capability))
    }
}

/// TTL-cached provider records.
///
/// Construct one per gateway (or per test) and share it behind an `Arc`.
pub struct CapabilityRegistry {
    source: Arc<dyn CapabilitySource>,
    ttl: Duration,
    cache: Cache<(), Arc<RegistrySnapshot>>,
    last_good: RwLock<Option<Arc<RegistrySnapshot>>>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CapabilityRegistry {
    /// Create a registry over `source` whose snapshot lives for `ttl`.
    #[must_use]
    pub fn new(source: Arc<dyn CapabilitySource>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            source,
            ttl,
            cache,
            last_good: RwLock::new(None),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the snapshot currently being served was loaded.
    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_good.read().await.as_ref().map(|s| s.loaded_at)
    }

    /// Current records, loading them if the cached copy has expired.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` only if the load fails and no earlier
    /// snapshot exists to fall back on.
    pub async fn snapshot(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        match self.cache.try_get_with((), self.load()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => self.fall_back(&err).await,
        }
    }

    /// Drop the cached snapshot and load again.
    ///
    /// # Errors
    ///
    /// Same as [`snapshot`](Self::snapshot).
    pub async fn refresh(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        self.cache.invalidate(&()).await;
        self.snapshot().await
    }

    /// Look up one provider record.
    ///
    /// # Errors
    ///
    /// Propagates snapshot load failures.
    pub async fn provider(
        &self,
        id: &ProviderId,
    ) -> Result<Option<ProviderCapabilitySet>, RegistryError> {
        Ok(self.snapshot().await?.get(id).cloned())
    }

    async fn load(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let records = self.source.load().await?;
        let snapshot = Arc::new(RegistrySnapshot::new(records));
        info!(
            providers = snapshot.providers.len(),
            "Loaded provider capability records"
        );
        *self.last_good.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn fall_back(
        &self,
        err: &Arc<RegistryError>,
    ) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        if let Some(stale) = self.last_good.read().await.clone() {
            warn!(error = %err, loaded_at = %stale.loaded_at, "Provider refresh failed, serving previous records");
            return Ok(stale);
        }
        debug!(error = %err, "Provider refresh failed with nothing cached");
        Err((**err).clone())
    }
}
