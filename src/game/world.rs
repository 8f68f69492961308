//! World state and the authoritative tick loop
//!
//! The `GameWorld` task owns every mutable piece of game state: the
//! session registry, the projectile set, and pickup bookkeeping. Session
//! tasks never touch state directly; they funnel decoded messages over an
//! mpsc channel and the world drains it at the top of each tick, so all
//! mutation happens on one task.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::game::arbiter::{self, HitClaim};
use crate::game::collision::{self, DetectedHit};
use crate::game::geometry::Vec3;
use crate::game::projectile::{ProjectileSet, WeaponStats};
use crate::game::session::SessionRegistry;
use crate::game::snapshot::SnapshotBuilder;
use crate::game::validate::{InputValidator, MoveOutcome};
use crate::game::{SessionEvent, SessionMessage};
use crate::util::time::{tick_duration, unix_millis};
use crate::ws::protocol::{ClientMsg, DestroyReason, ServerMsg};
use crate::ws::ConnectionTable;

/// Spawn scatter radius around the arena origin
const SPAWN_RADIUS: f32 = 40.0;
/// Body-center height of a freshly spawned player
const SPAWN_HEIGHT: f32 = 2.0;

/// Handle to the running world
#[derive(Clone)]
pub struct WorldHandle {
    pub input_tx: mpsc::Sender<SessionMessage>,
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
    pub projectile_count: Arc<AtomicUsize>,
}

impl WorldHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.broadcast_tx.subscribe()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn projectile_count(&self) -> usize {
        self.projectile_count.load(Ordering::Relaxed)
    }
}

/// The authoritative game world
pub struct GameWorld {
    tick_hz: u32,
    max_segment_step: f32,
    registry: SessionRegistry,
    projectiles: ProjectileSet,
    validator: InputValidator,
    collected_pickups: HashSet<String>,
    rng: ChaCha8Rng,
    input_rx: mpsc::Receiver<SessionMessage>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    connections: Arc<ConnectionTable>,
    player_count: Arc<AtomicUsize>,
    projectile_count: Arc<AtomicUsize>,
}

impl GameWorld {
    /// Create the world and its handle
    pub fn new(config: &Config, connections: Arc<ConnectionTable>, seed: u64) -> (Self, WorldHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));
        let projectile_count = Arc::new(AtomicUsize::new(0));

        let handle = WorldHandle {
            input_tx,
            broadcast_tx: broadcast_tx.clone(),
            player_count: player_count.clone(),
            projectile_count: projectile_count.clone(),
        };

        let world = Self {
            tick_hz: config.tick_hz,
            max_segment_step: config.max_segment_step,
            registry: SessionRegistry::new(config.max_players, config.inactivity_timeout_ms),
            projectiles: ProjectileSet::new(),
            validator: InputValidator::new(config.min_move_interval_ms, config.max_move_distance),
            collected_pickups: HashSet::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            input_rx,
            broadcast_tx,
            connections,
            player_count,
            projectile_count,
        };

        (world, handle)
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(tick_hz = self.tick_hz, "World started");

        let mut tick_interval = interval(tick_duration(self.tick_hz));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.step(unix_millis());
        }
    }

    /// One full tick: drain inputs, expire sessions, integrate
    /// projectiles, detect collisions, broadcast the snapshot.
    fn step(&mut self, now: u64) {
        self.process_messages();

        for id in self.registry.sweep_inactive(now) {
            info!(player_id = %id, "Session expired after inactivity");
            self.broadcast(ServerMsg::PlayerLeft { id });
        }

        for expiry in self.projectiles.advance_all(now) {
            self.broadcast(ServerMsg::ProjectileDestroyed {
                id: expiry.id,
                position: Some(expiry.position),
                hit_player_id: None,
                source_player_id: None,
                reason: expiry.reason,
                server_confirmed: false,
            });
        }

        for hit in collision::sweep(&self.projectiles, &self.registry, self.max_segment_step) {
            if self.projectiles.destroy(hit.projectile_id).is_some() {
                self.emit_destruction(&hit);
            }
        }

        self.player_count.store(self.registry.len(), Ordering::Relaxed);
        self.projectile_count
            .store(self.projectiles.len(), Ordering::Relaxed);

        self.broadcast(SnapshotBuilder::build(now, &self.registry, &self.projectiles));
    }

    /// Drain all pending session messages
    fn process_messages(&mut self) {
        while let Ok(msg) = self.input_rx.try_recv() {
            match msg.event {
                SessionEvent::Connected => self.handle_connect(msg.player_id, msg.received_at),
                SessionEvent::Disconnected => self.handle_disconnect(msg.player_id),
                SessionEvent::Message(client_msg) => {
                    self.handle_client_msg(msg.player_id, client_msg, msg.received_at)
                }
            }
        }
    }

    fn handle_connect(&mut self, player_id: Uuid, now: u64) {
        let spawn = self.spawn_position();
        match self.registry.register(player_id, spawn, now) {
            Ok(_) => {
                info!(
                    player_id = %player_id,
                    player_count = self.registry.len(),
                    "Player joined world"
                );
                self.broadcast(ServerMsg::PlayerJoined { id: player_id });
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Refusing connection at capacity");
                self.connections.send(
                    player_id,
                    ServerMsg::Error {
                        code: "server_full".to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    /// Remove the session and tell everyone. Projectiles the player
    /// already fired stay in flight and can still score hits.
    fn handle_disconnect(&mut self, player_id: Uuid) {
        if self.registry.unregister(player_id).is_some() {
            info!(
                player_id = %player_id,
                player_count = self.registry.len(),
                "Player left world"
            );
            self.broadcast(ServerMsg::PlayerLeft { id: player_id });
        }
    }

    fn handle_client_msg(&mut self, player_id: Uuid, msg: ClientMsg, now: u64) {
        match msg {
            ClientMsg::Move {
                position,
                rotation,
                input_sequence,
                input,
            } => {
                // Messages for expired or unknown sessions are no-ops
                let Some(state) = self.registry.get_mut(player_id) else {
                    return;
                };

                match self
                    .validator
                    .validate_move(state, position, rotation, input_sequence, input, now)
                {
                    MoveOutcome::Corrected { position, rotation } => {
                        self.connections
                            .send(player_id, ServerMsg::PositionCorrection { position, rotation });
                    }
                    MoveOutcome::Applied | MoveOutcome::Dropped => {}
                }
            }

            ClientMsg::ShootProjectile {
                position,
                direction,
                weapon_type,
            } => {
                if !self.registry.contains(player_id) {
                    return;
                }
                let Some(unit) = self.validator.validate_shoot(position, direction) else {
                    return;
                };

                self.touch(player_id, now);
                let stats = WeaponStats::for_class(weapon_type);
                let projectile =
                    self.projectiles
                        .spawn(player_id, position, unit, weapon_type, now);
                let created = ServerMsg::ProjectileCreated {
                    id: projectile.id,
                    owner_id: player_id,
                    position,
                    direction: unit,
                    speed: stats.speed,
                    weapon_type,
                };
                self.broadcast(created);
            }

            ClientMsg::ProjectileHitSuggestion {
                projectile_id,
                hit_player_id,
                position,
                prev_position,
                time_ms: _,
            } => {
                if !self.registry.contains(player_id) {
                    return;
                }
                self.touch(player_id, now);

                let claim = HitClaim {
                    projectile_id,
                    hit_player_id,
                    position,
                    prev_position,
                };
                if let Some(hit) = arbiter::consider_claim(
                    &mut self.projectiles,
                    &self.registry,
                    &claim,
                    self.max_segment_step,
                ) {
                    self.emit_destruction(&hit);
                }
            }

            ClientMsg::WeaponPickup {
                weapon_id,
                weapon_type,
                socket_name,
            } => {
                if !self.registry.contains(player_id)
                    || !self.validator.validate_pickup_id(&weapon_id)
                    || socket_name.len() > 64
                {
                    warn!(player_id = %player_id, "Dropping malformed weapon pickup");
                    return;
                }
                self.touch(player_id, now);
                self.broadcast(ServerMsg::WeaponPickup {
                    player_id,
                    weapon_id,
                    weapon_type,
                    socket_name,
                });
            }

            ClientMsg::PickupCollected { pickup_id } => {
                if !self.registry.contains(player_id)
                    || !self.validator.validate_pickup_id(&pickup_id)
                {
                    return;
                }
                self.touch(player_id, now);

                // First collect wins; retries are no-ops
                if self.collected_pickups.insert(pickup_id.clone()) {
                    self.broadcast(ServerMsg::PickupCollected {
                        pickup_id,
                        player_id,
                    });
                }
            }

            ClientMsg::Ping { t } => {
                self.connections.send(player_id, ServerMsg::Pong { t });
            }
        }
    }

    /// One detection, one pair of broadcasts
    fn emit_destruction(&self, hit: &DetectedHit) {
        self.broadcast(ServerMsg::ProjectileDestroyed {
            id: hit.projectile_id,
            position: Some(hit.point),
            hit_player_id: Some(hit.hit_player_id),
            source_player_id: Some(hit.owner_id),
            reason: DestroyReason::Hit,
            server_confirmed: true,
        });
        self.broadcast(ServerMsg::PlayerHit {
            hit_player_id: hit.hit_player_id,
            source_player_id: hit.owner_id,
            position: hit.point,
        });
    }

    fn broadcast(&self, msg: ServerMsg) {
        let _ = self.broadcast_tx.send(msg);
    }

    /// Any valid message counts as session activity
    fn touch(&mut self, player_id: Uuid, now: u64) {
        if let Some(state) = self.registry.get_mut(player_id) {
            state.last_active_at = now;
        }
    }

    /// Scatter new players on a ring around the arena origin
    fn spawn_position(&mut self) -> Vec3 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.rng.gen_range(0.0..SPAWN_RADIUS);
        Vec3::new(
            angle.cos() * distance,
            SPAWN_HEIGHT,
            angle.sin() * distance,
        )
    }
}
