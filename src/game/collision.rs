//! Compound collider and swept hit detection
//!
//! Players are approximated by a fixed set of spheres (head, torso, legs)
//! plus a smaller cabin sphere for the critical-hit zone. Projectile travel
//! segments are subdivided so fast rounds cannot step across a thin
//! collider inside one tick.

use uuid::Uuid;

use crate::game::geometry::{intersect_segment_sphere, SegmentHit, Sphere, Vec3};
use crate::game::projectile::ProjectileSet;
use crate::game::session::SessionRegistry;

/// One sphere of the compound collider, positioned relative to the
/// player's current position
#[derive(Debug, Clone, Copy)]
pub struct ColliderSphere {
    pub offset: Vec3,
    pub radius: f32,
}

/// Compound collider layout in its fixed, deterministic test order:
/// head, torso, legs, cabin.
pub const COLLIDER_SPHERES: [ColliderSphere; 4] = [
    ColliderSphere {
        offset: Vec3::new(0.0, 1.4, 0.0),
        radius: 0.45,
    },
    ColliderSphere {
        offset: Vec3::new(0.0, 0.4, 0.0),
        radius: 1.0,
    },
    ColliderSphere {
        offset: Vec3::new(0.0, -0.8, 0.0),
        radius: 0.7,
    },
    ColliderSphere {
        offset: Vec3::new(0.0, 0.9, 0.0),
        radius: 0.35,
    },
];

/// Collider spheres for a player, inflated by the projectile radius.
/// The combined radius (sphere + projectile) is applied here, at the one
/// place every hit test goes through.
fn player_spheres(player_position: Vec3, projectile_radius: f32) -> [Sphere; 4] {
    COLLIDER_SPHERES.map(|s| Sphere {
        center: player_position.add(s.offset),
        radius: s.radius + projectile_radius,
    })
}

/// Test a travel segment against one player's compound collider.
///
/// The segment is subdivided into ceil(length / max_segment_step) equal
/// sub-segments; each is tested against the spheres in collider order and
/// the first intersection wins. Returns the impact point and the distance
/// along the full segment.
pub fn test_segment_against_player(
    start: Vec3,
    end: Vec3,
    player_position: Vec3,
    projectile_radius: f32,
    max_segment_step: f32,
) -> Option<SegmentHit> {
    let spheres = player_spheres(player_position, projectile_radius);

    let len = end.sub(start).length();
    if len <= f32::EPSILON {
        return spheres
            .iter()
            .find_map(|s| intersect_segment_sphere(start, start, *s));
    }

    let steps = (len / max_segment_step.max(f32::EPSILON)).ceil().max(1.0) as usize;
    let sub_len = len / steps as f32;

    for i in 0..steps {
        let sub_start = start.lerp(end, i as f32 / steps as f32);
        let sub_end = start.lerp(end, (i + 1) as f32 / steps as f32);

        for sphere in spheres {
            if let Some(hit) = intersect_segment_sphere(sub_start, sub_end, sphere) {
                return Some(SegmentHit {
                    point: hit.point,
                    distance: i as f32 * sub_len + hit.distance,
                });
            }
        }
    }

    None
}

/// An authoritative hit found by the per-tick sweep
#[derive(Debug, Clone)]
pub struct DetectedHit {
    pub projectile_id: u64,
    pub owner_id: Uuid,
    pub hit_player_id: Uuid,
    pub point: Vec3,
}

/// Sweep every active projectile's travel segment against every other
/// player's collider, built from that player's current position.
///
/// Players are visited in ascending id order; when a segment crosses more
/// than one collider, the entry nearest the segment start wins.
pub fn sweep(
    projectiles: &ProjectileSet,
    registry: &SessionRegistry,
    max_segment_step: f32,
) -> Vec<DetectedHit> {
    let mut hits = Vec::new();

    for projectile in projectiles.iter() {
        let mut best: Option<(f32, DetectedHit)> = None;

        for player in registry.iter() {
            if player.id == projectile.owner_id {
                continue;
            }

            if let Some(hit) = test_segment_against_player(
                projectile.previous_position,
                projectile.position,
                player.position,
                projectile.radius,
                max_segment_step,
            ) {
                let is_nearer = best
                    .as_ref()
                    .map(|(distance, _)| hit.distance < *distance)
                    .unwrap_or(true);

                if is_nearer {
                    best = Some((
                        hit.distance,
                        DetectedHit {
                            projectile_id: projectile.id,
                            owner_id: projectile.owner_id,
                            hit_player_id: player.id,
                            point: hit.point,
                        },
                    ));
                }
            }
        }

        if let Some((_, hit)) = best {
            hits.push(hit);
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::SessionRegistry;
    use crate::ws::protocol::WeaponClass;
    use assert_approx_eq::assert_approx_eq;

    const STEP: f32 = 0.5;
    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

    #[test]
    fn cannon_round_crosses_torso_sphere() {
        // Cannon fired from (0,2,0) toward -z; after one 1/60s tick the
        // round has advanced 5 units, and its segment crosses the torso
        // of a player standing at (0,2,-5).
        let hit = test_segment_against_player(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, -5.0),
            Vec3::new(0.0, 2.0, -5.0),
            0.15,
            STEP,
        )
        .expect("torso hit");

        // Torso center sits at (0, 2.4, -5) with combined radius 1.15
        assert_approx_eq!(hit.point.z, -3.922, 1e-2);
        assert_approx_eq!(hit.point.y, 2.0, 1e-6);
        assert!(hit.distance < 5.0);
    }

    #[test]
    fn fast_round_does_not_tunnel_through_a_thin_target() {
        // 50 units of displacement in a single tick, far past the
        // collider's extent; sub-segment testing must still find it.
        let hit = test_segment_against_player(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, -50.0),
            Vec3::new(0.0, 2.0, -25.0),
            0.08,
            STEP,
        );
        assert!(hit.is_some());
    }

    #[test]
    fn wide_miss_reports_none() {
        let hit = test_segment_against_player(
            Vec3::new(10.0, 2.0, 0.0),
            Vec3::new(10.0, 2.0, -50.0),
            Vec3::new(0.0, 2.0, -25.0),
            0.15,
            STEP,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn hit_distance_accumulates_across_sub_segments() {
        // Entry point is ~21.6 units down a 50 unit segment; the reported
        // distance must be measured from the full segment start.
        let hit = test_segment_against_player(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 2.0, -50.0),
            Vec3::new(0.0, 2.0, -22.75),
            0.15,
            STEP,
        )
        .expect("hit");
        assert!(hit.distance > 20.0, "distance {}", hit.distance);
    }

    #[test]
    fn sweep_skips_the_projectile_owner() {
        let mut registry = SessionRegistry::new(8, 30_000);
        let shooter = Uuid::new_v4();
        let origin = Vec3::new(0.0, 2.0, 0.0);
        registry.register(shooter, origin, 0).unwrap();

        let mut projectiles = ProjectileSet::new();
        projectiles.spawn(shooter, origin, FORWARD, WeaponClass::Cannon, 0);
        // Segment crosses the shooter's own collider at the muzzle
        projectiles.advance_all(16);

        assert!(sweep(&projectiles, &registry, STEP).is_empty());
    }

    #[test]
    fn sweep_prefers_the_nearer_of_two_targets() {
        let mut registry = SessionRegistry::new(8, 30_000);
        let shooter = Uuid::new_v4();
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        registry.register(shooter, Vec3::new(50.0, 2.0, 0.0), 0).unwrap();
        registry.register(near, Vec3::new(0.0, 2.0, -10.0), 0).unwrap();
        registry.register(far, Vec3::new(0.0, 2.0, -40.0), 0).unwrap();

        let mut projectiles = ProjectileSet::new();
        projectiles.spawn(
            shooter,
            Vec3::new(0.0, 2.0, 0.0),
            FORWARD,
            WeaponClass::Cannon,
            0,
        );
        // 200ms at 300 u/s carries the segment through both targets
        projectiles.advance_all(200);

        let hits = sweep(&projectiles, &registry, STEP);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hit_player_id, near);
    }

    #[test]
    fn collider_derives_from_current_position_not_spawn() {
        let mut registry = SessionRegistry::new(8, 30_000);
        let shooter = Uuid::new_v4();
        let target = Uuid::new_v4();
        registry.register(shooter, Vec3::new(50.0, 2.0, 0.0), 0).unwrap();
        // Spawned far off the firing line...
        registry.register(target, Vec3::new(100.0, 2.0, 0.0), 0).unwrap();
        // ...then moved onto it.
        registry.get_mut(target).unwrap().position = Vec3::new(0.0, 2.0, -3.0);

        let mut projectiles = ProjectileSet::new();
        projectiles.spawn(
            shooter,
            Vec3::new(0.0, 2.0, 0.0),
            FORWARD,
            WeaponClass::Cannon,
            0,
        );
        projectiles.advance_all(16);

        let hits = sweep(&projectiles, &registry, STEP);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].hit_player_id, target);
    }
}
