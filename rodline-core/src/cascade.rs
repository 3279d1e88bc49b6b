//! Chained clears: detect, clear, collapse, repeat

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, Fall, Player, Pos};
use crate::lines::{DirectionSet, LineDetector, MatchSet};

/// How a clear converts into points
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// One point per distinct cleared cell
    #[default]
    PerCell,
    /// One point per qualifying run
    PerRun,
}

impl ScoringPolicy {
    pub fn points(self, matches: &MatchSet) -> u32 {
        match self {
            ScoringPolicy::PerCell => matches.cell_count() as u32,
            ScoringPolicy::PerRun => matches.run_count() as u32,
        }
    }
}

/// One pass of the cascade loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearStep {
    pub player: Player,
    pub matches: MatchSet,
    pub cleared: Vec<Pos>,
    pub falls: Vec<Fall>,
    pub points: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub steps: Vec<ClearStep>,
}

impl CascadeOutcome {
    pub fn total_points(&self) -> u32 {
        self.steps.iter().map(|s| s.points).sum()
    }

    pub fn cells_cleared(&self) -> usize {
        self.steps.iter().map(|s| s.cleared.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CascadeResolver {
    pub detector: LineDetector,
    pub policy: ScoringPolicy,
}

impl CascadeResolver {
    pub fn new(directions: DirectionSet, policy: ScoringPolicy) -> Self {
        Self {
            detector: LineDetector::new(directions),
            policy,
        }
    }

    /// Run a single detect/clear/collapse pass for `player`.
    ///
    /// Returns `None` once the player has no run left on the board.
    pub fn step(&self, board: &mut Board, player: Player) -> Option<ClearStep> {
        let matches = self.detector.find_runs(board, player)?;
        let cleared = matches.cells();
        let points = self.policy.points(&matches);
        board.clear(&cleared);
        let falls = board.apply_gravity();
        debug!(
            ?player,
            runs = matches.run_count(),
            cleared = cleared.len(),
            falls = falls.len(),
            "cascade step"
        );
        Some(ClearStep {
            player,
            matches,
            cleared,
            falls,
            points,
        })
    }

    /// Resolve every chained clear for `player`.
    ///
    /// Each pass strictly reduces the piece count, so the loop is bounded by
    /// the number of cells on the board.
    pub fn resolve(&self, board: &mut Board, player: Player) -> CascadeOutcome {
        let mut outcome = CascadeOutcome::default();
        let bound = board.size() as usize * board.size() as usize * board.height() as usize;
        while outcome.steps.len() < bound {
            match self.step(board, player) {
                Some(step) => outcome.steps.push(step),
                None => break,
            }
        }
        outcome
    }
}
