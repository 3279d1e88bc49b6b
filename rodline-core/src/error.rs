//! Error types for placement, configuration and synchronization

use thiserror::Error;

use crate::board::Player;

/// Why a placement request was refused.
///
/// Every variant is local and non-fatal: the shared board, scores and turn
/// are untouched when one of these is returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("rod ({x}, {z}) is full for this round")]
    RodFull { x: u8, z: u8 },

    #[error("rod ({x}, {z}) lies outside the active region")]
    OutOfActiveRegion { x: u8, z: u8 },

    #[error("not your turn: {requested:?} requested but {active:?} is active")]
    NotYourTurn { requested: Player, active: Player },

    #[error("input is locked while the previous placement resolves")]
    RequestWhileLocked,

    #[error("peer disconnected")]
    PeerDisconnected,

    #[error("the game is already over")]
    GameFinished,
}

/// Invalid match configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("board size must be at least 1")]
    ZeroSize,

    #[error("rod height must be at least 1")]
    ZeroHeight,

    #[error("rod height {height} is lower than the line length {size}")]
    HeightBelowLineLength { height: u8, size: u8 },

    #[error("progressive rounds need at least one size")]
    NoRounds,

    #[error("progressive round sizes must strictly increase, got {0:?}")]
    RoundSizesNotIncreasing(Vec<u8>),

    #[error("strategy weights must not all be zero")]
    NoStrategy,

    #[error("AI weight `{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f32 },

    #[error("thinking delay range is inverted: {min} > {max} ms")]
    InvalidDelayRange { min: u64, max: u64 },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Protocol-level failures between the authority and its mirrors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("delta sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("reply does not match the outstanding request")]
    UnknownRequest,

    #[error("malformed message: {0}")]
    Malformed(String),
}
