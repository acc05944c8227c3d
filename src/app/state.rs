//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::WorldStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // The one world every connection and the tick loop share
        let world = WorldStore::new(config.world, config.rng_seed);

        Self { config, world }
    }
}
