//! Shared server state.
//!
//! Everything derived from configuration lives in one [`Runtime`]. A reload
//! builds a complete new runtime and swaps it in; a request loads the current
//! runtime once and uses that snapshot until it finishes.

use std::sync::Arc;

use arc_swap::ArcSwap;
use solrgate_config::{AppConfig, ConfigError};
use solrgate_policy::{Evaluator, PolicyError, Profile};
use solrgate_search::{
    AccessFilterSupplier, EntitlementError, SolrClient, SolrError, supplier_from_config,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid solr settings: {0}")]
    Solr(#[from] SolrError),

    #[error("invalid entitlement settings: {0}")]
    Entitlement(#[from] EntitlementError),
}

/// Configuration plus everything compiled from it.
pub struct Runtime {
    config: AppConfig,
    evaluator: Evaluator,
    solr: SolrClient,
    entitlement: Arc<dyn AccessFilterSupplier>,
}

impl Runtime {
    pub fn from_config(config: AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let profile = Profile::from_settings(&config.policy)?;
        let solr = SolrClient::new(&config.solr)?;
        let entitlement = supplier_from_config(&config.entitlement)?;
        Ok(Self {
            config,
            evaluator: Evaluator::new(Arc::new(profile)),
            solr,
            entitlement,
        })
    }

    /// Replace the entitlement supplier built from configuration.
    pub fn with_entitlement(mut self, supplier: Arc<dyn AccessFilterSupplier>) -> Self {
        self.entitlement = supplier;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn solr(&self) -> &SolrClient {
        &self.solr
    }

    pub fn entitlement(&self) -> Arc<dyn AccessFilterSupplier> {
        self.entitlement.clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<ArcSwap<Runtime>>,
}

impl AppState {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime: Arc::new(ArcSwap::from_pointee(runtime)),
        }
    }

    /// Snapshot of the current runtime.
    pub fn runtime(&self) -> Arc<Runtime> {
        self.runtime.load_full()
    }

    pub fn replace(&self, runtime: Runtime) {
        self.runtime.store(Arc::new(runtime));
    }
}
