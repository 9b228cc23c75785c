//! Per-tick rigid circle dynamics
//!
//! Step order per piece matters: forces are rebuilt from scratch, velocity is
//! integrated before position, walls get the last word on position, and rest
//! is judged on the wall-corrected velocity.

use glam::Vec2;

use super::collision::{circle_circle_contact, circle_wall_contact, pair_mut, reflect_velocity, resolve_pair};
use super::container::Container;
use super::merge;
use super::piece::Piece;
use super::registry::Ability;
use super::state::GameState;
use crate::tuning::PhysicsTuning;

/// True if any live piece makes gravity heavier for everyone
pub fn heavy_gravity_active(pieces: &[Piece]) -> bool {
    pieces
        .iter()
        .any(|p| p.is_active() && p.has(Ability::HeavyGravity))
}

/// Gravity force on one piece (+y is down)
pub fn gravity_force(piece: &Piece, tuning: &PhysicsTuning, heavy: bool) -> Vec2 {
    let mut g = tuning.gravity * piece.mass;
    if heavy {
        g *= tuning.heavy_gravity_multiplier;
    }
    if piece.has(Ability::Float) {
        g *= tuning.buoyancy_factor;
    }
    Vec2::new(0.0, g)
}

/// Advance one piece: forces, velocity, position, rest flag, walls, spin
pub fn integrate_piece(
    piece: &mut Piece,
    container: &Container,
    tuning: &PhysicsTuning,
    heavy: bool,
    dt: f32,
) {
    piece.forces.clear();
    piece.forces.push(gravity_force(piece, tuning, heavy));

    let net: Vec2 = piece.forces.iter().copied().sum();
    piece.vel += net / piece.mass * dt;
    piece.pos += piece.vel * dt;

    collide_with_walls(piece, container, tuning);

    let rest = tuning.rest_threshold;
    piece.at_rest = piece.vel.length_squared() < rest * rest;
    piece.rest_ticks = if piece.at_rest {
        piece.rest_ticks.saturating_add(1)
    } else {
        0
    };

    piece.rotation += piece.angular_vel * dt;
    piece.angular_vel *= tuning.angular_damping;
}

/// Push a piece out of every wall it overlaps and bounce it
pub fn collide_with_walls(piece: &mut Piece, container: &Container, tuning: &PhysicsTuning) {
    let bounce = piece.bounce(tuning.bounce);
    for wall in &container.walls {
        let Some(contact) = circle_wall_contact(piece.pos, piece.radius, wall) else {
            continue;
        };
        let n = contact.normal;
        piece.pos += n * contact.penetration;

        // Tiny normal speeds are resting contact, not a bounce
        let vn = piece.vel.dot(n);
        piece.vel = if vn < 0.0 && -vn < tuning.rest_threshold {
            piece.vel - vn * n
        } else {
            reflect_velocity(piece.vel, n, bounce)
        };

        // Ground/wall friction on the tangential component
        let normal_part = n * piece.vel.dot(n);
        piece.vel = normal_part + (piece.vel - normal_part) * tuning.wall_friction;
    }
}

/// Integrate every live piece; merging and consumed pieces stay frozen
pub fn integrate(pieces: &mut [Piece], container: &Container, tuning: &PhysicsTuning, dt: f32) {
    let heavy = heavy_gravity_active(pieces);
    for piece in pieces.iter_mut().filter(|p| p.is_active()) {
        integrate_piece(piece, container, tuning, heavy, dt);
    }
}

/// Pairwise collision pass over all live pieces
///
/// Every overlapping pair is resolved, then offered to the merge engine:
/// first the pair itself, then (if the pair did not merge) one global
/// short-circuiting scan. Returns the number of pairs resolved.
pub fn collide_pieces(state: &mut GameState) -> usize {
    let epsilon = state.tuning.physics.contact_epsilon;
    let bounce = state.tuning.physics.bounce;
    let mut resolved = 0;

    // Merges only flag pieces during this pass, so indices stay valid
    let count = state.pieces.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let (a, b) = pair_mut(&mut state.pieces, i, j);
            if !a.is_active() || !b.is_active() {
                continue;
            }
            let Some(contact) = circle_circle_contact(a.pos, a.radius, b.pos, b.radius, epsilon)
            else {
                continue;
            };
            resolve_pair(a, b, &contact, bounce);
            resolved += 1;

            if !merge::try_merge(state, i, j) {
                merge::scan_for_merge(state);
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::registry::Registry;
    use crate::tuning::{ContainerTuning, Tuning};

    const DT: f32 = 1.0 / 60.0;

    fn piece(kind: &str, pos: Vec2, vel: Vec2) -> Piece {
        Piece::at(1, Registry::default().get(kind).unwrap(), pos, vel)
    }

    #[test]
    fn test_gravity_pulls_down() {
        let container = Container::new(&ContainerTuning::default());
        let tuning = PhysicsTuning::default();
        let mut p = piece("Cherry", Vec2::new(240.0, 200.0), Vec2::ZERO);
        integrate_piece(&mut p, &container, &tuning, false, DT);
        assert!((p.vel.y - tuning.gravity * DT).abs() < 1e-3);
        assert!(p.pos.y > 200.0);
        assert_eq!(p.forces.len(), 1);
    }

    #[test]
    fn test_buoyant_piece_falls_slower() {
        let tuning = PhysicsTuning::default();
        let fish = piece("Fish", Vec2::ZERO, Vec2::ZERO);
        let pebble = piece("Pebble", Vec2::ZERO, Vec2::ZERO);
        let a_fish = gravity_force(&fish, &tuning, false).y / fish.mass;
        let a_pebble = gravity_force(&pebble, &tuning, false).y / pebble.mass;
        assert!((a_fish - a_pebble * tuning.buoyancy_factor).abs() < 1e-3);
    }

    #[test]
    fn test_heavy_gravity_is_global() {
        let tuning = PhysicsTuning::default();
        let far_cherry = piece("Cherry", Vec2::new(30.0, 30.0), Vec2::ZERO);
        let sun = piece("Sun", Vec2::new(400.0, 600.0), Vec2::ZERO);
        let pieces = vec![far_cherry.clone(), sun];
        assert!(heavy_gravity_active(&pieces));
        let normal = gravity_force(&far_cherry, &tuning, false);
        let heavy = gravity_force(&far_cherry, &tuning, true);
        assert!((heavy.y - normal.y * tuning.heavy_gravity_multiplier).abs() < 1e-3);
    }

    #[test]
    fn test_merging_sun_does_not_count() {
        let mut sun = piece("Sun", Vec2::ZERO, Vec2::ZERO);
        sun.merging = true;
        assert!(!heavy_gravity_active(&[sun]));
    }

    #[test]
    fn test_floor_bounce_and_clamp() {
        let container = Container::new(&ContainerTuning::default());
        let tuning = PhysicsTuning::default();
        let floor_top = container.height - ContainerTuning::default().wall_thickness;
        let mut p = piece("Cherry", Vec2::new(240.0, floor_top - 10.0), Vec2::new(0.0, 400.0));
        collide_with_walls(&mut p, &container, &tuning);
        assert!(p.pos.y + p.radius <= floor_top + 1e-3);
        assert!(p.vel.y < 0.0);
        assert!((p.vel.y + 400.0 * tuning.bounce).abs() < 1e-2);
    }

    #[test]
    fn test_piece_settles_on_floor() {
        let container = Container::new(&ContainerTuning::default());
        let tuning = PhysicsTuning::default();
        let mut p = piece("Grape", Vec2::new(240.0, 300.0), Vec2::new(80.0, 0.0));
        for _ in 0..600 {
            integrate_piece(&mut p, &container, &tuning, false, DT);
        }
        let floor_top = container.height - ContainerTuning::default().wall_thickness;
        assert!(p.at_rest);
        assert!(p.is_settled(tuning.settle_ticks));
        assert!((p.pos.y + p.radius - floor_top).abs() < 1.0);
        let (left, right) = container.inner_x();
        assert!(p.pos.x - p.radius >= left - 1e-3 && p.pos.x + p.radius <= right + 1e-3);
    }

    #[test]
    fn test_frozen_pieces_do_not_move() {
        let tuning = Tuning::default();
        let container = Container::new(&tuning.container);
        let mut pieces = vec![piece("Cherry", Vec2::new(240.0, 200.0), Vec2::ZERO)];
        pieces[0].merging = true;
        integrate(&mut pieces, &container, &tuning.physics, DT);
        assert_eq!(pieces[0].pos, Vec2::new(240.0, 200.0));
    }

    #[test]
    fn test_collide_pieces_separates_different_families() {
        let mut state = GameState::new(1);
        state.clear_board();
        let registry = state.registry.clone();
        let a = Piece::at(1, registry.get("Cherry").unwrap(), Vec2::new(200.0, 400.0), Vec2::ZERO);
        let b = Piece::at(2, registry.get("Hamster").unwrap(), Vec2::new(220.0, 400.0), Vec2::ZERO);
        state.pieces = vec![a, b];
        assert_eq!(collide_pieces(&mut state), 1);
        let dist = (state.pieces[1].pos - state.pieces[0].pos).length();
        assert!(dist >= 14.0 + 16.0 - 1e-3);
        assert!(state.pending_merges.is_empty());
    }
}
