//! Match options shared by every command
//!
//! A command starts from its preset (or `--config FILE`) and applies the
//! flag overrides on top, then validates the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use rodline_core::{DirectionSet, MatchConfig, RoundPlan, ScoringPolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScoringArg {
    /// One point per cleared cell
    PerCell,
    /// One point per cleared run
    PerRun,
}

impl From<ScoringArg> for ScoringPolicy {
    fn from(arg: ScoringArg) -> Self {
        match arg {
            ScoringArg::PerCell => ScoringPolicy::PerCell,
            ScoringArg::PerRun => ScoringPolicy::PerRun,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct GameOptions {
    /// Match configuration JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Board side (and line length) for a single fixed round
    #[arg(long)]
    pub size: Option<u8>,

    /// How clears are scored
    #[arg(long, value_enum)]
    pub scoring: Option<ScoringArg>,

    /// Count 3-D diagonals as lines too
    #[arg(long)]
    pub spatial: bool,
}

impl GameOptions {
    /// Build the match configuration for a command
    pub fn resolve(&self, preset: MatchConfig, seed: Option<u64>) -> Result<MatchConfig> {
        let mut config = match &self.config {
            Some(path) => MatchConfig::load(path)
                .with_context(|| format!("Failed to load match config: {}", path.display()))?,
            None => preset,
        };

        if let Some(size) = self.size {
            config.rounds = RoundPlan::Fixed { size, height: size };
        }
        if let Some(scoring) = self.scoring {
            config.scoring = scoring.into();
        }
        if self.spatial {
            config.directions = DirectionSet::Spatial;
        }
        if let Some(seed) = seed {
            config = config.with_seed(seed);
        }

        config.validate().context("Invalid match configuration")?;
        Ok(config)
    }
}

// ============================================================================
// TESTS
// ============================================================================
