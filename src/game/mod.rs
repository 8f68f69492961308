//! Game simulation modules

pub mod arbiter;
pub mod collision;
pub mod geometry;
pub mod projectile;
pub mod session;
pub mod snapshot;
pub mod validate;
pub mod world;

pub use world::{GameWorld, WorldHandle};

use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

/// Session lifecycle and traffic, funneled to the world task
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Socket opened and welcomed
    Connected,
    /// Socket closed or errored
    Disconnected,
    /// A decoded client message
    Message(ClientMsg),
}

/// One unit of input for the world task
#[derive(Debug, Clone)]
pub struct SessionMessage {
    pub player_id: Uuid,
    pub event: SessionEvent,
    pub received_at: u64,
}
