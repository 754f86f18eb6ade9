//! Application state shared across handlers.

use crate::collector::Collector;
use crate::config::Config;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(collector: Collector, config: Config) -> Self {
        Self {
            collector: Arc::new(collector),
            config: Arc::new(config),
        }
    }
}
