//! Data-driven game balance
//!
//! Every section deserializes with `#[serde(default)]`, so a tuning file only
//! needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// Physics constants (pixels, seconds; +y points down)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Gravitational acceleration (px/s²)
    pub gravity: f32,
    /// Applied to every piece while a heavy-gravity piece is in play
    pub heavy_gravity_multiplier: f32,
    /// Gravity scale for buoyant pieces
    pub buoyancy_factor: f32,
    /// Restitution for pieces without their own bounce override
    pub bounce: f32,
    /// Tangential velocity kept per wall/floor contact (0-1)
    pub wall_friction: f32,
    /// Speed below which a piece counts as resting (px/s)
    pub rest_threshold: f32,
    /// Ticks a piece must stay at rest before it can overflow
    pub settle_ticks: u32,
    /// Contact margin for overlap and merge detection (px)
    pub contact_epsilon: f32,
    /// Angular velocity kept per tick (decorative spin)
    pub angular_damping: f32,
    /// Launch speed per pixel of pointer drag
    pub launch_power: f32,
    /// Launch speed cap (px/s)
    pub max_launch_speed: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 1400.0,
            heavy_gravity_multiplier: 2.0,
            buoyancy_factor: 0.5,
            bounce: 0.35,
            wall_friction: 0.96,
            rest_threshold: 30.0,
            settle_ticks: 20,
            contact_epsilon: 0.5,
            angular_damping: 0.98,
            launch_power: 5.0,
            max_launch_speed: 1200.0,
        }
    }
}

/// Container geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerTuning {
    pub width: f32,
    pub height: f32,
    pub wall_thickness: f32,
    /// Top of a freshly spawned piece
    pub spawn_y: f32,
    /// A resting piece whose top edge is above this line overflows
    pub overflow_line: f32,
}

impl Default for ContainerTuning {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 720.0,
            wall_thickness: 20.0,
            spawn_y: 40.0,
            overflow_line: 90.0,
        }
    }
}

/// Round progression and economy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTuning {
    pub starting_lives: u8,
    pub starting_gold: u32,
    pub starting_target: u64,
    /// Target score scale applied after each won round
    pub target_multiplier: f64,
    /// Gold for a won round before the family bonus
    pub base_reward: u32,
    pub throw_cooldown_ms: f64,
    /// Delay after the last throw before a round may complete
    pub round_end_cooldown_ms: f64,
    /// Simulation seconds between merge detection and commit
    pub merge_delay: f64,
    pub asteroids_min: u32,
    pub asteroids_max: u32,
    /// Initial downward speed of spawned asteroids (px/s)
    pub asteroid_drop_speed: f32,
    pub starting_deck: Vec<String>,
}

impl Default for RoundTuning {
    fn default() -> Self {
        let starting_deck = [
            "Cherry", "Cherry", "Cherry", "Cherry", "Strawberry", "Strawberry", "Hamster",
            "Hamster", "Hamster", "Fish", "Fish", "Pebble", "Pebble",
        ];
        Self {
            starting_lives: 3,
            starting_gold: 5,
            starting_target: 60,
            target_multiplier: 1.5,
            base_reward: 3,
            throw_cooldown_ms: 500.0,
            round_end_cooldown_ms: 2500.0,
            merge_delay: 0.12,
            asteroids_min: 1,
            asteroids_max: 5,
            asteroid_drop_speed: 120.0,
            starting_deck: starting_deck.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Shop economy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopTuning {
    pub offer_count: usize,
    /// Fraction of the shop cost refunded when selling
    pub sell_refund: f32,
}

impl Default for ShopTuning {
    fn default() -> Self {
        Self {
            offer_count: 3,
            sell_refund: 0.5,
        }
    }
}

/// Complete tuning bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub container: ContainerTuning,
    pub round: RoundTuning,
    pub shop: ShopTuning,
}

impl Tuning {
    /// Parse tuning from JSON (missing fields keep their defaults)
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load tuning from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> SimResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| crate::error::SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }
}
