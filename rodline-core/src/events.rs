//! Semantic events emitted by the turn controller, and the hooks that consume them

use serde::{Deserialize, Serialize};

use crate::board::{ActiveRegion, Fall, Player, Pos};
use crate::score::Outcome;

/// What happened, in the order it happened.
///
/// The same stream drives the presentation layer and the network deltas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    RoundStarted {
        round: u32,
        region: ActiveRegion,
        required_length: u8,
        capacity: u32,
        used_cells: u32,
    },
    PiecePlaced {
        pos: Pos,
        player: Player,
    },
    /// One cascade pass; `score` is the player's running total afterwards
    CellsCleared {
        positions: Vec<Pos>,
        falls: Vec<Fall>,
        player: Player,
        score: u32,
    },
    /// Exactly `remaining` placements are left in the round
    LastMoves {
        remaining: u32,
    },
    TurnChanged {
        player: Player,
    },
    RoundEnded {
        round: u32,
        round_scores: [u32; 2],
        totals: [u32; 2],
    },
    GameEnded {
        outcome: Outcome,
    },
}

impl GameEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::GameEnded { .. })
    }
}

/// Presentation-side listener (rendering, audio, ads, menus)
pub trait GameObserver: Send {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> GameObserver for F
where
    F: FnMut(&GameEvent) + Send,
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Economy hook, invoked once with the final outcome
pub trait Settlement: Send {
    fn settle(&mut self, outcome: &Outcome);
}
