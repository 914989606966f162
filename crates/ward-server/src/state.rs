use std::sync::Arc;

use ward_engine::SharedWardEngine;

use crate::config::AppConfig;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: SharedWardEngine,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(engine: SharedWardEngine, config: AppConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}
