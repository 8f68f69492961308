//! Input validation - the only network path that mutates player state
//!
//! Shape failures are dropped with a warn log, implausible movement gets
//! a corrective transform back, rate-limit violations are dropped
//! silently. Nothing here may panic on client input.

use tracing::{debug, warn};

use crate::game::geometry::{Quat, Vec3};
use crate::game::session::PlayerState;
use crate::ws::protocol::MoveInput;

/// Outcome of validating a move message
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Transform applied to the player state
    Applied,
    /// Move rejected; send the server's authoritative transform back to
    /// the offending connection only
    Corrected { position: Vec3, rotation: Quat },
    /// Malformed, rate-limited, or stale; no state change, no reply
    Dropped,
}

/// Stateless validator; thresholds come from configuration once at startup
#[derive(Debug, Clone, Copy)]
pub struct InputValidator {
    pub min_move_interval_ms: u64,
    pub max_move_distance: f32,
}

impl InputValidator {
    pub fn new(min_move_interval_ms: u64, max_move_distance: f32) -> Self {
        Self {
            min_move_interval_ms,
            max_move_distance,
        }
    }

    /// Validate and maybe apply a move message.
    pub fn validate_move(
        &self,
        state: &mut PlayerState,
        position: Vec3,
        rotation: Quat,
        input_sequence: u32,
        input: MoveInput,
        now: u64,
    ) -> MoveOutcome {
        if !position.is_finite() || !rotation.is_finite() {
            warn!(player_id = %state.id, "Dropping move with non-finite transform");
            return MoveOutcome::Dropped;
        }

        // Per-connection rate limit, independent of tick rate
        if now.saturating_sub(state.last_move_at) < self.min_move_interval_ms {
            return MoveOutcome::Dropped;
        }

        // Replayed or reordered input must not rewind reconciliation
        if input_sequence <= state.last_processed_input_seq {
            return MoveOutcome::Dropped;
        }

        let travelled = state.position.distance(position);
        if travelled > self.max_move_distance {
            debug!(
                player_id = %state.id,
                travelled,
                limit = self.max_move_distance,
                "Rejecting implausible move"
            );
            return MoveOutcome::Corrected {
                position: state.position,
                rotation: state.rotation,
            };
        }

        state.position = position;
        state.rotation = rotation;
        state.move_state = input;
        state.last_processed_input_seq = input_sequence;
        state.last_active_at = now;
        state.last_update_at = now;
        state.last_move_at = now;

        MoveOutcome::Applied
    }

    /// Shape-check a shoot message; returns the normalized direction.
    pub fn validate_shoot(&self, position: Vec3, direction: Vec3) -> Option<Vec3> {
        if !position.is_finite() || !direction.is_finite() {
            warn!("Dropping shot with non-finite fields");
            return None;
        }

        match direction.try_normalize() {
            Some(unit) => Some(unit),
            None => {
                warn!("Dropping shot with degenerate direction");
                None
            }
        }
    }

    /// Shape-check a pickup identifier.
    pub fn validate_pickup_id(&self, id: &str) -> bool {
        !id.is_empty() && id.len() <= 64
    }
}
