//! Simulation module
//!
//! All gameplay logic lives here. This module must stay host-independent:
//! - Time comes in as host timestamps, randomness from the seeded session RNG
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod abilities;
pub mod collision;
pub mod container;
pub mod deck;
pub mod merge;
pub mod physics;
pub mod piece;
pub mod registry;
pub mod round;
pub mod shop;
pub mod state;
pub mod tick;

pub use container::{Container, Wall};
pub use deck::Deck;
pub use merge::PendingMerge;
pub use piece::Piece;
pub use registry::{Ability, Attributes, CharacterType, Family, Registry};
pub use round::{RoundOutcome, launch_vector};
pub use shop::{PurchaseTarget, ShopOffer, ShopView};
pub use state::{GameEvent, GamePhase, GameState, Particle, ParticleKind, SoundCue};
pub use tick::{FrameClock, TickInput, step, tick};
