//! Merge Drop - a drop, collide and combine physics game
//!
//! Core modules:
//! - `sim`: Simulation (physics, merges, rounds, shop, game state)
//! - `host`: Contracts for the renderer, audio and HUD collaborators
//! - `tuning`: Data-driven game balance
//! - `error`: Error taxonomy

pub mod error;
pub mod host;
pub mod sim;
pub mod tuning;

#[cfg(target_arch = "wasm32")]
pub mod audio;

pub use error::{SimError, SimResult};
pub use sim::{GameState, TickInput, tick};
pub use tuning::Tuning;

/// Engine constants that are not balance knobs
pub mod consts {
    /// Longest frame the simulation will integrate in one step (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Particle cap; oldest particles are dropped first
    pub const MAX_PARTICLES: usize = 256;
    /// Seconds a score popup stays visible
    pub const POPUP_LIFETIME: f32 = 1.0;
    /// Upward drift of score popups (px/s)
    pub const POPUP_RISE_SPEED: f32 = 40.0;
}
