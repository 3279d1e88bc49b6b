//! Scores and final results

use serde::{Deserialize, Serialize};

use crate::board::Player;

/// Points for the current round plus points banked from finished rounds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub round: [u32; 2],
    pub banked: [u32; 2],
}

impl Scoreboard {
    pub fn add(&mut self, player: Player, points: u32) {
        self.round[player.index()] += points;
    }

    /// Round points plus everything banked so far
    pub fn total(&self, player: Player) -> u32 {
        self.round[player.index()] + self.banked[player.index()]
    }

    pub fn totals(&self) -> [u32; 2] {
        [self.total(Player::One), self.total(Player::Two)]
    }

    /// Move round points into the bank, returning what the round scored
    pub fn bank_round(&mut self) -> [u32; 2] {
        let round = self.round;
        self.banked[0] += round[0];
        self.banked[1] += round[1];
        self.round = [0, 0];
        round
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Winner(Player),
    Tie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    CapacityReached,
    /// The active player had no legal rod left
    Stalemate,
    PeerDisconnected,
}

/// Terminal result handed to observers and the settlement hook
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub result: GameResult,
    pub totals: [u32; 2],
    pub reason: EndReason,
}

impl Outcome {
    /// Higher total wins, equal totals tie
    pub fn from_totals(totals: [u32; 2], reason: EndReason) -> Self {
        let result = match totals[0].cmp(&totals[1]) {
            std::cmp::Ordering::Greater => GameResult::Winner(Player::One),
            std::cmp::Ordering::Less => GameResult::Winner(Player::Two),
            std::cmp::Ordering::Equal => GameResult::Tie,
        };
        Self {
            result,
            totals,
            reason,
        }
    }

    /// A peer leaving always ends the session as a tie
    pub fn disconnected(totals: [u32; 2]) -> Self {
        Self {
            result: GameResult::Tie,
            totals,
            reason: EndReason::PeerDisconnected,
        }
    }

    pub fn winner(&self) -> Option<Player> {
        match self.result {
            GameResult::Winner(p) => Some(p),
            GameResult::Tie => None,
        }
    }
}
