//! Collision detection and response for circles
//!
//! Pieces are rigid circles. Contacts between two pieces are resolved with a
//! restitution-scaled elastic exchange along the contact normal; walls are
//! static rectangles that reflect the normal velocity component.

use glam::Vec2;

use super::container::Wall;
use super::piece::Piece;

/// Below this centre distance the contact normal is undefined
const MIN_CONTACT_DISTANCE: f32 = 1e-4;

/// Result of a contact test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the first body toward the second
    /// (for walls: from the wall toward the circle)
    pub normal: Vec2,
    /// Overlap depth; may be slightly negative inside the epsilon margin
    pub penetration: f32,
}

/// Test two circles for contact
///
/// Returns `None` when the circles are apart, and also when their centres
/// coincide: with no usable normal the pair is skipped and re-checked on the
/// next tick once the positions diverge.
pub fn circle_circle_contact(
    pos_a: Vec2,
    radius_a: f32,
    pos_b: Vec2,
    radius_b: f32,
    epsilon: f32,
) -> Option<Contact> {
    let delta = pos_b - pos_a;
    let dist = delta.length();
    let reach = radius_a + radius_b;

    if dist >= reach + epsilon || dist < MIN_CONTACT_DISTANCE {
        return None;
    }

    Some(Contact {
        normal: delta / dist,
        penetration: reach - dist,
    })
}

/// Test a circle against a wall rectangle
pub fn circle_wall_contact(pos: Vec2, radius: f32, wall: &Wall) -> Option<Contact> {
    if wall.contains(pos) {
        // Centre is inside the wall: push out along the shallowest axis
        let to_min = pos - wall.min;
        let to_max = wall.max - pos;
        let candidates = [
            (to_min.x, Vec2::NEG_X),
            (to_max.x, Vec2::X),
            (to_min.y, Vec2::NEG_Y),
            (to_max.y, Vec2::Y),
        ];
        let (depth, normal) = candidates
            .into_iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))?;
        return Some(Contact {
            normal,
            penetration: depth + radius,
        });
    }

    let closest = wall.closest_point(pos);
    let delta = pos - closest;
    let dist = delta.length();
    if dist >= radius || dist < MIN_CONTACT_DISTANCE {
        return None;
    }

    Some(Contact {
        normal: delta / dist,
        penetration: radius - dist,
    })
}

/// Reflect the component of `velocity` going into a surface
///
/// v' = v - (1 + e)(v·n)n when moving into the surface, unchanged otherwise
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2, bounce: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn < 0.0 {
        velocity - (1.0 + bounce) * vn * normal
    } else {
        velocity
    }
}

/// Resolve a contact between two pieces
///
/// Velocity: two-body exchange along the normal with restitution
/// sqrt(bounce_a * bounce_b); tangential components are untouched.
/// Position: overlap removed along the normal, split inversely by mass.
pub fn resolve_pair(a: &mut Piece, b: &mut Piece, contact: &Contact, default_bounce: f32) {
    let n = contact.normal;
    let e = (a.bounce(default_bounce) * b.bounce(default_bounce)).sqrt();
    let total_mass = a.mass + b.mass;

    // Relative normal speed; negative means approaching
    let vn = (b.vel - a.vel).dot(n);
    if vn < 0.0 {
        let impulse = -(1.0 + e) * vn / (1.0 / a.mass + 1.0 / b.mass);
        a.vel -= n * (impulse / a.mass);
        b.vel += n * (impulse / b.mass);
    }

    if contact.penetration > 0.0 {
        let push = contact.penetration / total_mass;
        a.pos -= n * (push * b.mass);
        b.pos += n * (push * a.mass);
    }
}

/// Mutable references to two distinct pieces
///
/// Panics if `i == j` (callers iterate `j > i`).
pub fn pair_mut(pieces: &mut [Piece], i: usize, j: usize) -> (&mut Piece, &mut Piece) {
    assert_ne!(i, j, "pair_mut needs two distinct indices");
    if i < j {
        let (left, right) = pieces.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = pieces.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}
