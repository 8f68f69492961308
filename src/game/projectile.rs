//! Projectile simulation - weapon classes, integration, expiry

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::game::geometry::Vec3;
use crate::ws::protocol::{DestroyReason, WeaponClass};

/// Weapon stats per weapon class
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Projectile speed (units per second)
    pub speed: f32,
    /// Projectile hitbox radius
    pub radius: f32,
    /// Maximum travel distance before the round expires
    pub max_distance: f32,
    /// Maximum lifetime in milliseconds
    pub lifetime_ms: u64,
    /// Damage per hit
    pub damage: f32,
}

impl WeaponStats {
    pub fn for_class(class: WeaponClass) -> Self {
        match class {
            WeaponClass::Cannon => Self {
                speed: 300.0,
                radius: 0.15,
                max_distance: 100.0,
                lifetime_ms: 3_000,
                damage: 25.0,
            },
            WeaponClass::MachineGun => Self {
                speed: 400.0,
                radius: 0.08,
                max_distance: 60.0,
                lifetime_ms: 1_500,
                damage: 8.0,
            },
            WeaponClass::Rocket => Self {
                speed: 120.0,
                radius: 0.3,
                max_distance: 150.0,
                lifetime_ms: 5_000,
                damage: 40.0,
            },
        }
    }
}

/// Active projectile in the simulation
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub owner_id: Uuid,
    pub position: Vec3,
    /// Position before the latest integration step; the collision sweep
    /// uses previous..position as the travel segment
    pub previous_position: Vec3,
    /// Unit travel direction
    pub direction: Vec3,
    pub speed: f32,
    pub radius: f32,
    pub weapon_class: WeaponClass,
    pub created_at: u64,
    pub last_update_at: u64,
    pub distance_traveled: f32,
    pub max_distance: f32,
    pub max_lifetime_ms: u64,
    /// Flips false exactly once, when a destruction cause is determined
    pub active: bool,
}

impl Projectile {
    fn new(id: u64, owner_id: Uuid, position: Vec3, direction: Vec3, class: WeaponClass, now: u64) -> Self {
        let stats = WeaponStats::for_class(class);
        Self {
            id,
            owner_id,
            position,
            previous_position: position,
            direction,
            speed: stats.speed,
            radius: stats.radius,
            weapon_class: class,
            created_at: now,
            last_update_at: now,
            distance_traveled: 0.0,
            max_distance: stats.max_distance,
            max_lifetime_ms: stats.lifetime_ms,
            active: true,
        }
    }

    /// Integrate one step. Delta time comes from this projectile's own
    /// last update, not the global tick delta, to tolerate tick jitter.
    fn advance(&mut self, now: u64) {
        let dt = now.saturating_sub(self.last_update_at) as f32 / 1000.0;
        self.previous_position = self.position;
        self.position = self.position.add(self.direction.scale(self.speed * dt));
        self.distance_traveled += self.speed * dt;
        self.last_update_at = now;
    }

    fn expiry_reason(&self, now: u64) -> Option<DestroyReason> {
        if self.distance_traveled > self.max_distance {
            Some(DestroyReason::MaxDistance)
        } else if now.saturating_sub(self.created_at) > self.max_lifetime_ms {
            Some(DestroyReason::Timeout)
        } else {
            None
        }
    }
}

/// A projectile that expired during integration
#[derive(Debug, Clone)]
pub struct Expiry {
    pub id: u64,
    pub position: Vec3,
    pub reason: DestroyReason,
}

/// Owner of every in-flight projectile.
///
/// Ids are a monotonic counter, unique for the process lifetime and never
/// reused. All mutation happens on the world task.
pub struct ProjectileSet {
    projectiles: BTreeMap<u64, Projectile>,
    next_id: u64,
}

impl ProjectileSet {
    pub fn new() -> Self {
        Self {
            projectiles: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Spawn a projectile with weapon-class defaults. `direction` must
    /// already be validated as a unit vector.
    pub fn spawn(
        &mut self,
        owner_id: Uuid,
        position: Vec3,
        direction: Vec3,
        class: WeaponClass,
        now: u64,
    ) -> &Projectile {
        let id = self.next_id;
        self.next_id += 1;

        let previous = self.projectiles.insert(
            id,
            Projectile::new(id, owner_id, position, direction, class, now),
        );
        debug_assert!(previous.is_none(), "projectile id {} reused", id);

        &self.projectiles[&id]
    }

    /// Integrate every active projectile and remove the ones that expired
    /// by distance or lifetime. Expired projectiles never reach the
    /// collision sweep.
    pub fn advance_all(&mut self, now: u64) -> Vec<Expiry> {
        let mut expired = Vec::new();

        for projectile in self.projectiles.values_mut() {
            projectile.advance(now);
            if let Some(reason) = projectile.expiry_reason(now) {
                projectile.active = false;
                expired.push(Expiry {
                    id: projectile.id,
                    position: projectile.position,
                    reason,
                });
            }
        }

        for expiry in &expired {
            self.projectiles.remove(&expiry.id);
        }

        expired
    }

    /// Deactivate and remove in one step, so no later tick or late client
    /// message can re-trigger an outcome for this id. Returns None if the
    /// projectile was already resolved.
    pub fn destroy(&mut self, id: u64) -> Option<Projectile> {
        self.projectiles.remove(&id).map(|mut p| {
            p.active = false;
            p
        })
    }

    pub fn get(&self, id: u64) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}

impl Default for ProjectileSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    #[test]
    fn cannon_defaults_match_tuning() {
        let stats = WeaponStats::for_class(WeaponClass::Cannon);
        assert_approx_eq!(stats.speed, 300.0);
        assert_approx_eq!(stats.radius, 0.15);
        assert_approx_eq!(stats.max_distance, 100.0);
    }

    #[test]
    fn advance_integrates_from_own_last_update() {
        let mut set = ProjectileSet::new();
        let origin = Vec3::new(0.0, 2.0, 0.0);
        set.spawn(Uuid::new_v4(), origin, FORWARD, WeaponClass::Cannon, 1_000);

        // One 1/60s tick at speed 300 advances 5 units
        let expired = set.advance_all(1_000 + 1_000 / 60);
        assert!(expired.is_empty());

        let p = set.iter().next().expect("still alive");
        assert_approx_eq!(p.position.z, -4.8, 0.3);
        assert_approx_eq!(p.previous_position.z, 0.0, 1e-6);
        assert_approx_eq!(p.distance_traveled, 4.8, 0.3);
    }

    #[test]
    fn projectile_expires_past_max_distance() {
        let mut set = ProjectileSet::new();
        set.spawn(Uuid::new_v4(), Vec3::ZERO, FORWARD, WeaponClass::Cannon, 0);

        // 500ms of flight at 300 u/s is 150 units, past the 100 unit cap
        let expired = set.advance_all(500);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].reason, DestroyReason::MaxDistance);
        assert!(set.is_empty());
    }

    #[test]
    fn projectile_expires_past_lifetime() {
        let mut set = ProjectileSet::new();
        set.spawn(Uuid::new_v4(), Vec3::ZERO, FORWARD, WeaponClass::Rocket, 0);

        // Keep traveled distance pinned at zero each step so the 5s
        // lifetime check is the one that fires.
        let mut expired = Vec::new();
        for now in (0..=6_000).step_by(1_000) {
            if let Some(p) = set.projectiles.values_mut().next() {
                p.distance_traveled = 0.0;
            }
            expired = set.advance_all(now);
            if !expired.is_empty() {
                break;
            }
        }
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].reason, DestroyReason::Timeout);
    }

    #[test]
    fn destroy_is_single_shot() {
        let mut set = ProjectileSet::new();
        let id = set
            .spawn(Uuid::new_v4(), Vec3::ZERO, FORWARD, WeaponClass::Cannon, 0)
            .id;

        let destroyed = set.destroy(id).expect("first destroy wins");
        assert!(!destroyed.active);
        assert!(set.destroy(id).is_none());
        assert!(set.get(id).is_none());
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut set = ProjectileSet::new();
        let a = set
            .spawn(Uuid::new_v4(), Vec3::ZERO, FORWARD, WeaponClass::Cannon, 0)
            .id;
        set.destroy(a);
        let b = set
            .spawn(Uuid::new_v4(), Vec3::ZERO, FORWARD, WeaponClass::Cannon, 0)
            .id;
        assert!(b > a);
    }
}
