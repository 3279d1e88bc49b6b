//! Static position evaluation

use serde::{Deserialize, Serialize};

use crate::board::{Board, Player};
use crate::lines::{line_kind, LineDetector, LineKind};

/// Per-line weights for position evaluation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Own piece in a row along X or Z that the opponent has not touched
    pub own_axis: f32,
    /// Empty cell in a line the opponent has not touched
    pub open_cell: f32,
    /// Opponent piece in a row along X or Z free of own pieces
    pub opp_axis: f32,
    pub own_diagonal: f32,
    pub opp_diagonal: f32,
    pub own_vertical: f32,
    pub opp_vertical: f32,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            own_axis: 12.0,
            open_cell: 1.0,
            opp_axis: 8.0,
            own_diagonal: 16.0,
            opp_diagonal: 12.0,
            own_vertical: 10.0,
            opp_vertical: 7.0,
        }
    }
}

impl Heuristics {
    fn weights(&self, kind: LineKind) -> (f32, f32) {
        match kind {
            LineKind::Axis => (self.own_axis, self.opp_axis),
            LineKind::Diagonal => (self.own_diagonal, self.opp_diagonal),
            LineKind::Vertical => (self.own_vertical, self.opp_vertical),
        }
    }
}

/// Evaluate the board from `player`'s perspective.
///
/// Only lines still winnable by one side count: a line holding pieces of both
/// players is dead and scores nothing.
pub fn evaluate(board: &Board, player: Player, detector: &LineDetector, h: &Heuristics) -> f32 {
    let opponent = player.opponent();
    let mut score = 0.0f32;

    for window in detector.windows(board.region()) {
        let (mut own, mut opp) = (0u32, 0u32);
        for pos in window.cells() {
            match board.get(pos) {
                Some(p) if p == player => own += 1,
                Some(p) if p == opponent => opp += 1,
                _ => {}
            }
        }
        let empty = window.len as u32 - own - opp;
        let (own_w, opp_w) = h.weights(line_kind(window.direction));

        if opp == 0 {
            score += own as f32 * own_w + empty as f32 * h.open_cell;
        } else if own == 0 {
            score -= opp as f32 * opp_w;
        }
    }

    score
}
