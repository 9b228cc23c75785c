//! Live pieces and the piece factory

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::container::Container;
use super::registry::{Ability, Attributes, CharacterType};

/// A piece in the container or in the player's hand
///
/// Everything from the character type is copied in at spawn, so a piece
/// never shares mutable state with the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub id: u32,
    /// Character type name
    pub kind: String,
    pub family: String,
    pub tier: Option<u8>,
    pub attributes: Attributes,
    pub abilities: Vec<Ability>,

    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Forces accumulated this tick (cleared at the start of each step)
    #[serde(skip)]
    pub forces: Vec<Vec2>,
    pub at_rest: bool,
    /// Consecutive ticks spent at rest
    #[serde(default)]
    pub rest_ticks: u32,

    /// Decorative only
    pub rotation: f32,
    pub angular_vel: f32,

    /// Committed to a merge: frozen, excluded from collisions and merges
    pub merging: bool,
    /// Eaten or destroyed; removed at the end of the tick
    pub consumed: bool,
}

impl Piece {
    /// Factory: a fresh piece at the spawn point, fully inside the container
    pub fn spawn(id: u32, ty: &CharacterType, container: &Container) -> Self {
        let pos = container.spawn_point(ty.attributes.radius);
        Self::at(id, ty, pos, Vec2::ZERO)
    }

    /// Factory: a fresh piece at an explicit position and velocity
    pub fn at(id: u32, ty: &CharacterType, pos: Vec2, vel: Vec2) -> Self {
        let attributes = ty.attributes.clone();
        Self {
            id,
            kind: ty.name.clone(),
            family: ty.family.clone(),
            tier: ty.tier,
            radius: attributes.radius,
            mass: attributes.mass,
            angular_vel: attributes.angular_velocity_seed,
            attributes,
            abilities: ty.abilities.clone(),
            pos,
            vel,
            forces: Vec::with_capacity(2),
            at_rest: false,
            rest_ticks: 0,
            rotation: 0.0,
            merging: false,
            consumed: false,
        }
    }

    #[inline]
    pub fn has(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    #[inline]
    pub fn is_hazard(&self) -> bool {
        self.tier.is_none()
    }

    /// Still taking part in physics, collisions and merges
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.merging && !self.consumed
    }

    /// At rest for at least `min_ticks` ticks in a row
    ///
    /// Gravity takes an unsupported piece past the rest threshold within a
    /// couple of ticks, so only supported pieces get here.
    #[inline]
    pub fn is_settled(&self, min_ticks: u32) -> bool {
        self.at_rest && self.rest_ticks >= min_ticks
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.attributes.base_value
    }

    /// Restitution: the piece's own override or the global default
    #[inline]
    pub fn bounce(&self, default: f32) -> f32 {
        self.attributes.bounce.unwrap_or(default)
    }

    /// Y of the top edge (+y is down)
    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y - self.radius
    }

    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.vel.length_squared()
    }
}
