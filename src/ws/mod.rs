//! WebSocket transport

pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use protocol::ServerMsg;

/// Unicast routing table for connected sessions.
///
/// World-wide traffic (snapshots, events) rides the world's broadcast
/// channel; this table carries the per-connection messages: position
/// corrections, pongs, and admission errors.
#[derive(Default)]
pub struct ConnectionTable {
    senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMsg>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
        }
    }

    pub fn insert(&self, id: Uuid, tx: mpsc::UnboundedSender<ServerMsg>) {
        self.senders.insert(id, tx);
    }

    pub fn remove(&self, id: Uuid) {
        self.senders.remove(&id);
    }

    /// Send to one connection; returns false if it is gone
    pub fn send(&self, id: Uuid, msg: ServerMsg) -> bool {
        self.senders
            .get(&id)
            .map(|tx| tx.send(msg).is_ok())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }
}
