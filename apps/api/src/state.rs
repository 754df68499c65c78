use std::sync::Arc;

use crate::ai::{ConfigCache, Orchestrator, ProviderBackend};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Provider settings cache; admin updates go through it so it invalidates.
    pub settings: Arc<ConfigCache>,
    /// Wire backend, used directly only by the connectivity probe.
    pub backend: Arc<dyn ProviderBackend>,
    pub ai: Orchestrator,
}

impl AppState {
    pub fn new(settings: Arc<ConfigCache>, backend: Arc<dyn ProviderBackend>) -> Self {
        let ai = Orchestrator::new(Arc::clone(&settings), Arc::clone(&backend));
        Self {
            settings,
            backend,
            ai,
        }
    }
}
