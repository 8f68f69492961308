//! Snapshot assembly for the per-tick world-state broadcast

use crate::game::projectile::ProjectileSet;
use crate::game::session::SessionRegistry;
use crate::ws::protocol::{PlayerSnapshot, ProjectileSnapshot, ServerMsg};

/// Builds the combined world-state message a tick emits.
///
/// Always assembled after the tick's sweep/integration/collision stages so
/// it reflects fully-resolved state, never a half-updated one.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(now: u64, registry: &SessionRegistry, projectiles: &ProjectileSet) -> ServerMsg {
        let players: Vec<PlayerSnapshot> = registry
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                position: p.position,
                rotation: p.rotation,
                last_processed_input_seq: p.last_processed_input_seq,
                move_state: p.move_state,
                time_since_last_update: now.saturating_sub(p.last_update_at),
            })
            .collect();

        let projectiles: Vec<ProjectileSnapshot> = projectiles
            .iter()
            .map(|p| ProjectileSnapshot {
                id: p.id,
                position: p.position,
            })
            .collect();

        ServerMsg::GameState {
            timestamp: now,
            players,
            projectiles,
        }
    }
}
