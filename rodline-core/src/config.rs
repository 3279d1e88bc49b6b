//! Match configuration: board sizing, scoring rules, seats and AI tuning

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::{ActiveRegion, Player};
use crate::cascade::ScoringPolicy;
use crate::error::ConfigError;
use crate::eval::Heuristics;
use crate::lines::DirectionSet;

// ============================================================================
// ROUNDS
// ============================================================================

/// How the board is sized across the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoundPlan {
    /// A single round on the whole board; lines are `size` long
    Fixed { size: u8, height: u8 },
    /// One round per entry, each a centered cube inside a board allocated at
    /// the largest size
    Progressive { sizes: Vec<u8> },
}

impl RoundPlan {
    pub fn round_count(&self) -> u32 {
        match self {
            RoundPlan::Fixed { .. } => 1,
            RoundPlan::Progressive { sizes } => sizes.len() as u32,
        }
    }

    /// Allocated (size, height) of the shared board
    pub fn board_dims(&self) -> (u8, u8) {
        match self {
            RoundPlan::Fixed { size, height } => (*size, *height),
            RoundPlan::Progressive { sizes } => {
                let max = sizes.iter().copied().max().unwrap_or(0);
                (max, max)
            }
        }
    }

    /// Active region for round `round` (zero-based)
    pub fn region(&self, round: u32) -> Option<ActiveRegion> {
        match self {
            RoundPlan::Fixed { size, height } => {
                (round == 0).then(|| ActiveRegion::full(*size, *height))
            }
            RoundPlan::Progressive { sizes } => {
                let (board_size, _) = self.board_dims();
                sizes
                    .get(round as usize)
                    .map(|&side| ActiveRegion::centered(board_size, side))
            }
        }
    }
}

// ============================================================================
// SEATS AND AI
// ============================================================================

/// Who controls a player
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    #[default]
    Human,
    Ai,
}

/// Relative odds of each strategy on a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub random: u32,
    pub threat_aware: u32,
    pub deep: u32,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            random: 20,
            threat_aware: 30,
            deep: 50,
        }
    }
}

impl StrategyWeights {
    pub fn total(&self) -> u32 {
        self.random + self.threat_aware + self.deep
    }
}

/// AI tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub strategy: StrategyWeights,
    /// Weight of cells cleared by the AI's own cascade
    pub cascade_weight: f32,
    /// Weight of the opponent's best cascade reply
    pub reply_weight: f32,
    /// Weight of the static positional heuristic
    pub positional_weight: f32,
    pub heuristics: Heuristics,
    pub think_min_ms: u64,
    pub think_max_ms: u64,
    /// Random seed for reproducibility (None = fixed default)
    pub seed: Option<u64>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyWeights::default(),
            cascade_weight: 1000.0,
            reply_weight: 250.0,
            positional_weight: 1.0,
            heuristics: Heuristics::default(),
            think_min_ms: 350,
            think_max_ms: 800,
            seed: None,
        }
    }
}

impl AiConfig {
    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set custom heuristics
    pub fn with_heuristics(mut self, heuristics: Heuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyWeights) -> Self {
        self.strategy = strategy;
        self
    }

    /// No thinking pause
    pub fn instant(mut self) -> Self {
        self.think_min_ms = 0;
        self.think_max_ms = 0;
        self
    }
}

/// Pauses taken by async drivers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Between cascade passes, so peers apply one clear before the next
    pub settle_delay_ms: u64,
    pub round_end_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay_ms: 250,
            round_end_delay_ms: 500,
        }
    }
}

impl Timing {
    pub fn instant() -> Self {
        Self {
            settle_delay_ms: 0,
            round_end_delay_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn round_end_delay(&self) -> Duration {
        Duration::from_millis(self.round_end_delay_ms)
    }
}

// ============================================================================
// MATCH CONFIG
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub name: String,
    pub rounds: RoundPlan,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub directions: DirectionSet,
    #[serde(default)]
    pub seats: [Seat; 2],
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub timing: Timing,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::single_player()
    }
}

impl MatchConfig {
    /// 5×5×5 board, Player Two is the AI
    pub fn single_player() -> Self {
        Self {
            name: "single-player".to_string(),
            rounds: RoundPlan::Fixed { size: 5, height: 5 },
            scoring: ScoringPolicy::default(),
            directions: DirectionSet::default(),
            seats: [Seat::Human, Seat::Ai],
            ai: AiConfig::default(),
            timing: Timing::default(),
        }
    }

    /// 5×5×5 board, two humans
    pub fn versus() -> Self {
        Self {
            name: "versus".to_string(),
            seats: [Seat::Human, Seat::Human],
            ..Self::single_player()
        }
    }

    /// Rounds of 3, 4 and 5 on one persisted 5×5×5 board, two humans
    pub fn progressive() -> Self {
        Self {
            name: "progressive".to_string(),
            rounds: RoundPlan::Progressive {
                sizes: vec![3, 4, 5],
            },
            ..Self::versus()
        }
    }

    /// Both seats played by the AI
    pub fn ai_vs_ai(mut self) -> Self {
        self.seats = [Seat::Ai, Seat::Ai];
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ai.seed = Some(seed);
        self
    }

    /// Drop every delay, for tests and batch simulation
    pub fn instant(mut self) -> Self {
        self.ai = self.ai.instant();
        self.timing = Timing::instant();
        self
    }

    pub fn seat(&self, player: Player) -> Seat {
        self.seats[player.index()]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.rounds {
            RoundPlan::Fixed { size, height } => {
                if *size == 0 {
                    return Err(ConfigError::ZeroSize);
                }
                if *height == 0 {
                    return Err(ConfigError::ZeroHeight);
                }
                if height < size {
                    return Err(ConfigError::HeightBelowLineLength {
                        height: *height,
                        size: *size,
                    });
                }
            }
            RoundPlan::Progressive { sizes } => {
                if sizes.is_empty() {
                    return Err(ConfigError::NoRounds);
                }
                if sizes.contains(&0) {
                    return Err(ConfigError::ZeroSize);
                }
                if sizes.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ConfigError::RoundSizesNotIncreasing(sizes.clone()));
                }
            }
        }

        let ai = &self.ai;
        if ai.strategy.total() == 0 {
            return Err(ConfigError::NoStrategy);
        }
        for (name, value) in [
            ("cascade_weight", ai.cascade_weight),
            ("reply_weight", ai.reply_weight),
            ("positional_weight", ai.positional_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if ai.think_min_ms > ai.think_max_ms {
            return Err(ConfigError::InvalidDelayRange {
                min: ai.think_min_ms,
                max: ai.think_max_ms,
            });
        }
        Ok(())
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MatchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
