//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::WorldHandle;
use crate::ws::ConnectionTable;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldHandle,
    pub connections: Arc<ConnectionTable>,
}

impl AppState {
    pub fn new(config: Config, world: WorldHandle, connections: Arc<ConnectionTable>) -> Self {
        Self {
            config: Arc::new(config),
            world,
            connections,
        }
    }
}
