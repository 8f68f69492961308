//! Session registry - admission control and liveness

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::game::geometry::{Quat, Vec3};
use crate::ws::protocol::MoveInput;

/// Authoritative per-session player state.
///
/// Mutated only by the input validator after a message passes validation,
/// always on the world task.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: Uuid,
    /// Last validated transform
    pub position: Vec3,
    pub rotation: Quat,
    /// Echoed to the client for reconciliation
    pub last_processed_input_seq: u32,
    /// Last time any valid message arrived; drives the inactivity sweep
    pub last_active_at: u64,
    /// Last time the transform changed
    pub last_update_at: u64,
    /// Last accepted move, for the min-move-interval check
    pub last_move_at: u64,
    /// Last validated directional flags
    pub move_state: MoveInput,
}

impl PlayerState {
    pub fn new(id: Uuid, spawn_position: Vec3, now: u64) -> Self {
        Self {
            id,
            position: spawn_position,
            rotation: Quat::IDENTITY,
            last_processed_input_seq: 0,
            last_active_at: now,
            last_update_at: now,
            last_move_at: 0,
            move_state: MoveInput::default(),
        }
    }
}

/// Returned when the registry is at its player cap
#[derive(Debug, thiserror::Error)]
#[error("server is at capacity ({0} players)")]
pub struct CapacityError(pub usize);

/// Owner of all connected player sessions.
///
/// Iteration order is ascending player id (BTreeMap), which keeps the
/// collision sweep deterministic.
pub struct SessionRegistry {
    players: BTreeMap<Uuid, PlayerState>,
    max_players: usize,
    inactivity_timeout_ms: u64,
}

impl SessionRegistry {
    pub fn new(max_players: usize, inactivity_timeout_ms: u64) -> Self {
        Self {
            players: BTreeMap::new(),
            max_players,
            inactivity_timeout_ms,
        }
    }

    /// Admit a new session, refusing at capacity without touching any
    /// existing player's state.
    pub fn register(
        &mut self,
        id: Uuid,
        spawn_position: Vec3,
        now: u64,
    ) -> Result<&PlayerState, CapacityError> {
        if self.players.len() >= self.max_players {
            return Err(CapacityError(self.max_players));
        }

        self.players
            .insert(id, PlayerState::new(id, spawn_position, now));
        Ok(&self.players[&id])
    }

    pub fn unregister(&mut self, id: Uuid) -> Option<PlayerState> {
        self.players.remove(&id)
    }

    /// Remove every session idle past the timeout; returns the expired ids
    /// for "player left" broadcasts.
    pub fn sweep_inactive(&mut self, now: u64) -> Vec<Uuid> {
        let timeout = self.inactivity_timeout_ms;
        let expired: Vec<Uuid> = self
            .players
            .values()
            .filter(|p| now.saturating_sub(p.last_active_at) > timeout)
            .map(|p| p.id)
            .collect();

        for id in &expired {
            self.players.remove(id);
        }

        expired
    }

    pub fn get(&self, id: Uuid) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.players.contains_key(&id)
    }

    /// Players in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_refuses_at_capacity_without_touching_state() {
        let mut registry = SessionRegistry::new(2, 30_000);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry.register(a, Vec3::new(1.0, 2.0, 3.0), 100).unwrap();
        registry.register(b, Vec3::ZERO, 100).unwrap();

        let before: Vec<PlayerState> = registry.iter().cloned().collect();

        let refused = registry.register(Uuid::new_v4(), Vec3::ZERO, 200);
        assert!(refused.is_err());

        let after: Vec<PlayerState> = registry.iter().cloned().collect();
        assert_eq!(before.len(), after.len());
        for (x, y) in before.iter().zip(after.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.position, y.position);
            assert_eq!(x.last_active_at, y.last_active_at);
        }
    }

    #[test]
    fn sweep_removes_only_stale_sessions() {
        let mut registry = SessionRegistry::new(8, 1_000);
        let fresh = Uuid::new_v4();
        let stale = Uuid::new_v4();

        registry.register(stale, Vec3::ZERO, 0).unwrap();
        registry.register(fresh, Vec3::ZERO, 0).unwrap();
        registry.get_mut(fresh).unwrap().last_active_at = 1_500;

        let expired = registry.sweep_inactive(2_000);
        assert_eq!(expired, vec![stale]);
        assert!(registry.contains(fresh));
        assert!(!registry.contains(stale));
    }

    #[test]
    fn sweep_keeps_sessions_exactly_at_the_timeout() {
        let mut registry = SessionRegistry::new(8, 1_000);
        let id = Uuid::new_v4();
        registry.register(id, Vec3::ZERO, 0).unwrap();

        assert!(registry.sweep_inactive(1_000).is_empty());
        assert_eq!(registry.sweep_inactive(1_001), vec![id]);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = SessionRegistry::new(8, 1_000);
        let id = Uuid::new_v4();
        registry.register(id, Vec3::ZERO, 0).unwrap();

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
    }
}
