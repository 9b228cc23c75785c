//! Error types for the simulation core
//!
//! Nothing here is fatal: every variant describes an operation that was
//! rejected or skipped while the session carries on.

use crate::sim::GamePhase;

/// Errors raised by simulation, registry, shop and configuration operations
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Frame delta was zero, negative, NaN or infinite
    #[error("invalid frame delta: {0}s")]
    InvalidDeltaTime(f32),

    /// Character type name not present in the registry
    #[error("unknown character type: {0}")]
    UnknownCharacter(String),

    /// Family id not present in the registry
    #[error("unknown family: {0}")]
    UnknownFamily(String),

    /// Character type is not part of its family's evolution chain
    #[error("{name} is not in the evolution chain of family {family}")]
    NotInChain { name: String, family: String },

    /// Character type data failed validation
    #[error("invalid character type {name}: {reason}")]
    InvalidCharacter { name: String, reason: String },

    /// Registry has no non-evolving hazard type to spawn
    #[error("registry has no hazard type")]
    MissingHazardType,

    /// Throw requested with nothing in hand
    #[error("no piece in hand")]
    NoPieceInHand,

    /// Throw requested before the cooldown elapsed
    #[error("throw on cooldown ({remaining_ms:.0} ms remaining)")]
    ThrowCooldown { remaining_ms: f64 },

    /// Operation not allowed in the current phase
    #[error("operation requires phase {expected:?}, current phase is {actual:?}")]
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },

    /// Shop purchase the player cannot afford
    #[error("not enough gold: cost {cost}, have {gold}")]
    InsufficientGold { cost: u32, gold: u32 },

    /// Shop slot index out of range or already bought
    #[error("no shop offer in slot {0}")]
    OfferNotFound(usize),

    /// Card to sell is not in the static deck
    #[error("{0} is not in the deck")]
    NotInDeck(String),

    /// Inventory slot index out of range
    #[error("inventory slot {0} is empty")]
    InventorySlotEmpty(usize),

    /// Malformed JSON configuration or registry data
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for simulation operations
pub type SimResult<T> = Result<T, SimError>;
