//! rodline Core - Rules engine and synchronization
//!
//! This crate provides the core game logic for rodline:
//! - Rod grid with gravity and a centered active region
//! - Line detection along planar or spatial directions
//! - Cascade resolution and scoring
//! - Turn state machine for fixed and progressive rounds
//! - AI move selection (random, threat-aware, deep heuristic)
//! - Authority/mirror synchronization for networked play

pub mod board;
pub mod lines;
pub mod cascade;
pub mod score;
pub mod events;
pub mod error;
pub mod config;
pub mod eval;
pub mod ai;
pub mod turn;
pub mod sync;

// Re-exports for convenient access
pub use board::{Board, Player, Pos, Column, ActiveRegion, Fall};
pub use lines::{LineDetector, DirectionSet, WinRun, MatchSet, PLANAR_DIRECTIONS, SPATIAL_DIRECTIONS};
pub use cascade::{CascadeResolver, CascadeOutcome, ClearStep, ScoringPolicy};
pub use score::{Scoreboard, Outcome, GameResult, EndReason};
pub use events::{GameEvent, GameObserver, Settlement};
pub use error::{PlacementError, ConfigError, SyncError};
pub use config::{MatchConfig, RoundPlan, Seat, AiConfig, StrategyWeights, Timing};
pub use eval::{Heuristics, evaluate};
pub use ai::{AiAgent, Strategy};
pub use turn::{TurnController, TurnState, Phase};
