//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::tools::ToolRegistry;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    tools: ToolRegistry,
}

impl AppState {
    #[must_use]
    pub fn new(config: GatewayConfig, tools: ToolRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, tools }),
        }
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the tool dispatcher.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }
}
