use std::sync::Arc;

use crate::config::Config;
use crate::export::RefreshScheduler;
use crate::observability::Metrics;
use crate::store::FjallStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<FjallStore>,
    pub scheduler: Arc<RefreshScheduler>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<FjallStore>,
        scheduler: Arc<RefreshScheduler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            scheduler,
            metrics,
        }
    }
}
