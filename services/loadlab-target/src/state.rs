//! Shared state for the target server.

use crate::config::TargetConfig;
use crate::identity::{default_sources, IdentityCache, IdentityError, IdentitySource};
use std::path::Path;
use std::sync::Arc;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TargetConfig>,
    /// Write-once identity for `/`
    pub identity: Arc<IdentityCache>,
    pub identity_sources: Arc<Vec<Arc<dyn IdentitySource>>>,
}

impl AppState {
    /// Build state with an explicit identity source chain.
    pub fn new(config: TargetConfig, identity_sources: Vec<Arc<dyn IdentitySource>>) -> Self {
        Self {
            config: Arc::new(config),
            identity: Arc::new(IdentityCache::new()),
            identity_sources: Arc::new(identity_sources),
        }
    }

    /// Build state with the default metadata-service and hostname sources.
    pub fn from_config(config: TargetConfig) -> Result<Self, IdentityError> {
        let sources = default_sources(&config.identity)?;
        Ok(Self::new(config, sources))
    }

    pub fn blob_path(&self) -> &Path {
        &self.config.workload.blob_path
    }
}
