//! Client hit-claim arbitration
//!
//! Clients may report hits they detected locally for low-latency
//! confirmation, but every claim is re-validated through the same segment
//! geometry the authoritative sweep uses. A claim can only accelerate an
//! outcome the server agrees with; it can never force one.

use tracing::debug;
use uuid::Uuid;

use crate::game::collision::{test_segment_against_player, DetectedHit};
use crate::game::geometry::Vec3;
use crate::game::projectile::ProjectileSet;
use crate::game::session::SessionRegistry;

/// A client-submitted hit claim
#[derive(Debug, Clone)]
pub struct HitClaim {
    pub projectile_id: u64,
    pub hit_player_id: Uuid,
    /// Claimed impact position (ray destination)
    pub position: Vec3,
    /// Claimed ray origin; falls back to the projectile's tracked
    /// previous position when omitted
    pub prev_position: Option<Vec3>,
}

/// Re-validate a client hit claim and, if the server geometry agrees,
/// destroy the projectile and return the hit for event broadcast.
///
/// Claims for missing or already-resolved projectiles are no-ops, which
/// makes replayed claims idempotent. A disputed claim leaves the
/// projectile live for the next tick's authoritative sweep.
pub fn consider_claim(
    projectiles: &mut ProjectileSet,
    registry: &SessionRegistry,
    claim: &HitClaim,
    max_segment_step: f32,
) -> Option<DetectedHit> {
    let projectile = match projectiles.get(claim.projectile_id) {
        Some(p) => p,
        None => {
            debug!(
                projectile_id = claim.projectile_id,
                "Ignoring claim for unknown or resolved projectile"
            );
            return None;
        }
    };

    if claim.hit_player_id == projectile.owner_id {
        debug!(projectile_id = claim.projectile_id, "Ignoring self-hit claim");
        return None;
    }

    let target = match registry.get(claim.hit_player_id) {
        Some(t) => t,
        None => {
            debug!(
                projectile_id = claim.projectile_id,
                "Ignoring claim against unknown player"
            );
            return None;
        }
    };

    if !claim.position.is_finite()
        || claim.prev_position.map(|p| !p.is_finite()).unwrap_or(false)
    {
        debug!(projectile_id = claim.projectile_id, "Ignoring non-finite claim");
        return None;
    }

    let start = claim.prev_position.unwrap_or(projectile.previous_position);
    let end = claim.position;

    let hit = test_segment_against_player(
        start,
        end,
        target.position,
        projectile.radius,
        max_segment_step,
    );

    match hit {
        Some(hit) => {
            let owner_id = projectile.owner_id;
            let hit_player_id = target.id;
            projectiles
                .destroy(claim.projectile_id)
                .map(|destroyed| DetectedHit {
                    projectile_id: destroyed.id,
                    owner_id,
                    hit_player_id,
                    point: hit.point,
                })
        }
        None => {
            debug!(
                projectile_id = claim.projectile_id,
                hit_player_id = %claim.hit_player_id,
                "Rejecting hit claim the server geometry disputes"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::WeaponClass;

    const STEP: f32 = 0.5;
    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    struct Fixture {
        projectiles: ProjectileSet,
        registry: SessionRegistry,
        shooter: Uuid,
        target: Uuid,
        projectile_id: u64,
    }

    fn fixture() -> Fixture {
        let mut registry = SessionRegistry::new(8, 30_000);
        let shooter = Uuid::new_v4();
        let target = Uuid::new_v4();
        registry.register(shooter, Vec3::new(0.0, 2.0, 10.0), 0).unwrap();
        registry.register(target, Vec3::new(0.0, 2.0, -5.0), 0).unwrap();

        let mut projectiles = ProjectileSet::new();
        let projectile_id = projectiles
            .spawn(
                shooter,
                Vec3::new(0.0, 2.0, 0.0),
                FORWARD,
                WeaponClass::Cannon,
                0,
            )
            .id;
        projectiles.advance_all(16);

        Fixture {
            projectiles,
            registry,
            shooter,
            target,
            projectile_id,
        }
    }

    #[test]
    fn geometrically_sound_claim_destroys_the_projectile() {
        let mut f = fixture();
        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: f.target,
            position: Vec3::new(0.0, 2.0, -5.0),
            prev_position: Some(Vec3::new(0.0, 2.0, 0.0)),
        };

        let hit = consider_claim(&mut f.projectiles, &f.registry, &claim, STEP)
            .expect("claim confirmed");
        assert_eq!(hit.hit_player_id, f.target);
        assert_eq!(hit.owner_id, f.shooter);
        assert!(f.projectiles.get(f.projectile_id).is_none());
    }

    #[test]
    fn replayed_claim_is_a_no_op() {
        let mut f = fixture();
        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: f.target,
            position: Vec3::new(0.0, 2.0, -5.0),
            prev_position: Some(Vec3::new(0.0, 2.0, 0.0)),
        };

        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_some());
        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_none());
    }

    #[test]
    fn disputed_geometry_leaves_the_projectile_live() {
        let mut f = fixture();
        // Claimed ray passes nowhere near the target's collider
        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: f.target,
            position: Vec3::new(40.0, 2.0, -5.0),
            prev_position: Some(Vec3::new(40.0, 2.0, 0.0)),
        };

        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_none());
        assert!(f.projectiles.get(f.projectile_id).is_some());
    }

    #[test]
    fn claim_without_origin_uses_the_tracked_segment() {
        let mut f = fixture();
        // Tracked previous position is (0,2,0); claiming the impact at the
        // target's torso without an origin must still confirm.
        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: f.target,
            position: Vec3::new(0.0, 2.0, -5.0),
            prev_position: None,
        };

        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_some());
    }

    #[test]
    fn claims_for_unknown_ids_are_no_ops() {
        let mut f = fixture();

        let claim = HitClaim {
            projectile_id: 999,
            hit_player_id: f.target,
            position: Vec3::new(0.0, 2.0, -5.0),
            prev_position: None,
        };
        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_none());

        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: Uuid::new_v4(),
            position: Vec3::new(0.0, 2.0, -5.0),
            prev_position: None,
        };
        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_none());
        assert!(f.projectiles.get(f.projectile_id).is_some());
    }

    #[test]
    fn self_hit_claims_are_rejected() {
        let mut f = fixture();
        let claim = HitClaim {
            projectile_id: f.projectile_id,
            hit_player_id: f.shooter,
            position: Vec3::new(0.0, 2.0, 10.0),
            prev_position: Some(Vec3::new(0.0, 2.0, 12.0)),
        };
        assert!(consider_claim(&mut f.projectiles, &f.registry, &claim, STEP).is_none());
    }
}
