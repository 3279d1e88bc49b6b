//! Move selection for AI-controlled seats

use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::board::{Board, Column, Player, Pos};
use crate::cascade::{CascadeResolver, ScoringPolicy};
use crate::config::AiConfig;
use crate::eval::evaluate;
use crate::lines::DirectionSet;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Seed used when the config does not name one
const DEFAULT_SEED: u64 = 42;

// ============================================================================
// STRATEGIES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Uniform over legal rods
    Random,
    /// Block the opponent's immediate win, else take our own, else random
    ThreatAware,
    /// One-ply cascade simulation with opponent-reply lookahead
    DeepHeuristic,
}

// ============================================================================
// AI AGENT
// ============================================================================

/// AI player. Every evaluation runs on board copies.
pub struct AiAgent {
    pub config: AiConfig,
    resolver: CascadeResolver,
    rng: ChaCha8Rng,
}

impl AiAgent {
    pub fn new(config: AiConfig, directions: DirectionSet) -> Self {
        let seed = config.seed.unwrap_or(DEFAULT_SEED);
        Self::with_seed(config, directions, seed)
    }

    pub fn with_seed(config: AiConfig, directions: DirectionSet, seed: u64) -> Self {
        Self {
            config,
            // Simulations measure cleared cells whatever the scoring policy
            resolver: CascadeResolver::new(directions, ScoringPolicy::PerCell),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pick a rod for `player`, or `None` when no rod is legal
    pub fn choose_move(&mut self, board: &Board, player: Player) -> Option<Column> {
        let strategy = self.roll_strategy();
        let choice = self.choose_with(strategy, board, player);
        debug!(?player, ?strategy, ?choice, "ai move");
        choice
    }

    /// Weighted roll among the three strategies
    pub fn roll_strategy(&mut self) -> Strategy {
        let w = self.config.strategy;
        let total = w.total().max(1);
        let roll = self.rng.gen_range(0..total);
        if roll < w.random {
            Strategy::Random
        } else if roll < w.random + w.threat_aware {
            Strategy::ThreatAware
        } else {
            Strategy::DeepHeuristic
        }
    }

    pub fn choose_with(&mut self, strategy: Strategy, board: &Board, player: Player) -> Option<Column> {
        match strategy {
            Strategy::Random => self.random_move(board),
            Strategy::ThreatAware => self.threat_move(board, player),
            Strategy::DeepHeuristic => self.deep_move(board, player),
        }
    }

    /// Uniformly random pause before committing a move
    pub fn thinking_delay(&mut self) -> Duration {
        let (min, max) = (self.config.think_min_ms, self.config.think_max_ms);
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    fn random_move(&mut self, board: &Board) -> Option<Column> {
        board.valid_columns().choose(&mut self.rng).copied()
    }

    fn threat_move(&mut self, board: &Board, player: Player) -> Option<Column> {
        if let Some(col) = self.winning_column(board, player.opponent()) {
            return Some(col);
        }
        if let Some(col) = self.winning_column(board, player) {
            return Some(col);
        }
        self.random_move(board)
    }

    fn deep_move(&mut self, board: &Board, player: Player) -> Option<Column> {
        let mut best: Option<(Column, f32)> = None;
        for col in board.valid_columns() {
            let score = self.composite_score(board, player, col);
            if !score.is_finite() {
                continue;
            }
            // Strict comparison keeps the first column on ties
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((col, score));
            }
        }
        match best {
            Some((col, _)) => Some(col),
            None => self.random_move(board),
        }
    }

    /// First rod where a `player` piece would complete a run through itself
    pub fn winning_column(&self, board: &Board, player: Player) -> Option<Column> {
        board.valid_columns().into_iter().find(|&(x, z)| {
            let mut sim = board.clone();
            let Ok(y) = sim.place(x, z, player) else {
                return false;
            };
            self.resolver
                .detector
                .find_runs(&sim, player)
                .is_some_and(|m| m.contains(Pos::new(x, y, z)))
        })
    }

    /// `own_cascade × cascade_weight + heuristic × positional_weight
    ///  − best_reply × reply_weight`
    pub fn composite_score(&self, board: &Board, player: Player, (x, z): Column) -> f32 {
        let mut sim = board.clone();
        if sim.place(x, z, player).is_err() {
            return f32::NEG_INFINITY;
        }
        let cleared = self.resolver.resolve(&mut sim, player).cells_cleared();
        let positional = evaluate(
            &sim,
            player,
            &self.resolver.detector,
            &self.config.heuristics,
        );
        let reply = self.best_reply(&sim, player.opponent());

        cleared as f32 * self.config.cascade_weight
            + positional * self.config.positional_weight
            - reply as f32 * self.config.reply_weight
    }

    /// Most cells `player` could clear with one placement
    pub fn best_reply(&self, board: &Board, player: Player) -> usize {
        let enough = board.region().side as usize;
        let mut best = 0;
        for (x, z) in board.valid_columns() {
            let mut sim = board.clone();
            if sim.place(x, z, player).is_err() {
                continue;
            }
            best = best.max(self.resolver.resolve(&mut sim, player).cells_cleared());
            if best >= enough {
                break;
            }
        }
        best
    }
}
