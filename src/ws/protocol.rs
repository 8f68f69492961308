//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::geometry::{Quat, Vec3};

/// Weapon classes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    /// Slow fire, heavy round
    Cannon,
    /// Fast, small rounds
    MachineGun,
    /// Slow round with long reach
    Rocket,
}

impl Default for WeaponClass {
    fn default() -> Self {
        Self::Cannon
    }
}

/// Directional input flags from the client
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MoveInput {
    #[serde(default)]
    pub move_forward: bool,
    #[serde(default)]
    pub move_backward: bool,
    #[serde(default)]
    pub move_left: bool,
    #[serde(default)]
    pub move_right: bool,
    #[serde(default)]
    pub is_running: bool,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Client-predicted transform for validation
    Move {
        position: Vec3,
        rotation: Quat,
        /// Sequence number for client-side prediction reconciliation
        input_sequence: u32,
        input: MoveInput,
    },

    /// Fire a projectile from the given muzzle position
    ShootProjectile {
        position: Vec3,
        direction: Vec3,
        weapon_type: WeaponClass,
    },

    /// Client-side hit detection result, subject to server re-validation
    ProjectileHitSuggestion {
        projectile_id: u64,
        hit_player_id: Uuid,
        position: Vec3,
        /// Ray origin; the server falls back to its own tracked position
        #[serde(default)]
        prev_position: Option<Vec3>,
        /// Client timestamp of the claimed hit
        #[serde(default)]
        time_ms: Option<u64>,
    },

    /// Weapon attached to the player model
    WeaponPickup {
        weapon_id: String,
        weapon_type: WeaponClass,
        socket_name: String,
    },

    /// Map pickup consumed
    PickupCollected {
        pickup_id: String,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Cause of a projectile's destruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyReason {
    Hit,
    MaxDistance,
    Timeout,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        player_id: Uuid,
        server_time: u64,
    },

    /// World state snapshot, broadcast every tick
    GameState {
        timestamp: u64,
        players: Vec<PlayerSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
    },

    /// Authoritative transform, unicast after a rejected move
    PositionCorrection {
        position: Vec3,
        rotation: Quat,
    },

    /// A validated shot entered the simulation
    ProjectileCreated {
        id: u64,
        owner_id: Uuid,
        position: Vec3,
        direction: Vec3,
        speed: f32,
        weapon_type: WeaponClass,
    },

    /// A projectile left the simulation; at most one per projectile id
    ProjectileDestroyed {
        id: u64,
        position: Option<Vec3>,
        hit_player_id: Option<Uuid>,
        source_player_id: Option<Uuid>,
        reason: DestroyReason,
        /// True when server geometry established the destruction
        server_confirmed: bool,
    },

    /// Damage notification for external game-state collaborators
    PlayerHit {
        hit_player_id: Uuid,
        source_player_id: Uuid,
        position: Vec3,
    },

    /// A new session joined the world
    PlayerJoined {
        id: Uuid,
    },

    /// Session ended (disconnect or inactivity timeout)
    PlayerLeft {
        id: Uuid,
    },

    /// Weapon pickup echoed for other clients' visuals
    WeaponPickup {
        player_id: Uuid,
        weapon_id: String,
        weapon_type: WeaponClass,
        socket_name: String,
    },

    /// Pickup consumed, broadcast exactly once per pickup id
    PickupCollected {
        pickup_id: String,
        player_id: Uuid,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub position: Vec3,
    pub rotation: Quat,
    /// Last input sequence the server applied, echoed for reconciliation
    pub last_processed_input_seq: u32,
    pub move_state: MoveInput,
    /// Milliseconds since this player's transform last changed
    pub time_since_last_update: u64,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub position: Vec3,
}
