//! Simulate command - AI vs AI series
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_match(), play_series(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: progress bar, formatting utilities

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use rodline_core::{EndReason, GameEvent, MatchConfig, Player, TurnController};

use crate::options::GameOptions;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub options: GameOptions,

    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Play the games in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Use the progressive 3-4-5 round plan
    #[arg(long)]
    pub progressive: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

/// Result of a single game
#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    pub game_number: usize,
    pub seed: u64,
    pub winner: Option<u8>,
    pub totals: [u32; 2],
    pub reason: EndReason,
    pub placements: u32,
    pub rounds: u32,
}

/// Aggregated series results
#[derive(Clone, Debug, Serialize)]
pub struct SeriesResults {
    pub generated_at: DateTime<Utc>,
    pub total_games: usize,
    pub p1_wins: usize,
    pub p2_wins: usize,
    pub ties: usize,
    pub avg_p1_score: f32,
    pub avg_p2_score: f32,
    pub avg_placements: f32,
    pub games: Vec<GameRecord>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// This function reads like a table of contents:
/// 1. Build the AI-vs-AI configuration
/// 2. Play the series (optionally in parallel)
/// 3. Report results
pub fn run(args: SimulateArgs, seed: Option<u64>) -> Result<()> {
    let config = configure_match(&args, seed)?;

    tracing::info!(
        "Simulating {} games ({}, {:?} scoring)",
        args.games,
        if args.parallel { "parallel" } else { "sequential" },
        config.scoring
    );

    let base_seed = create_base_seed(seed);
    tracing::info!("Base seed: {}", base_seed);
    let progress = (!args.quiet && !args.json).then(|| progress_bar(args.games as u64));
    let games = play_series(&config, args.games, base_seed, args.parallel, progress.as_ref())?;
    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    let results = compute_statistics(games);
    report_results(&results, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn configure_match(args: &SimulateArgs, seed: Option<u64>) -> Result<MatchConfig> {
    let preset = if args.progressive {
        MatchConfig::progressive()
    } else {
        MatchConfig::versus()
    };
    let config = args.options.resolve(preset, seed)?;
    Ok(config.ai_vs_ai().instant())
}

/// Play every game; game `i` uses seed `base_seed + i`
pub fn play_series(
    config: &MatchConfig,
    games: usize,
    base_seed: u64,
    parallel: bool,
    progress: Option<&ProgressBar>,
) -> Result<Vec<GameRecord>> {
    let play = |game_index: usize| {
        let seed = base_seed.wrapping_add(game_index as u64);
        let record = play_single_game(config, game_index + 1, seed);
        if let Some(pb) = progress {
            pb.inc(1);
        }
        record
    };

    if parallel {
        (0..games).into_par_iter().map(play).collect()
    } else {
        (0..games).map(play).collect()
    }
}

fn report_results(results: &SeriesResults, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(results).context("Failed to encode results")?;
        println!("{}", text);
    } else {
        print_text_results(results);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one AI-vs-AI game to completion
pub fn play_single_game(config: &MatchConfig, game_number: usize, seed: u64) -> Result<GameRecord> {
    let mut controller = TurnController::new(config.clone().with_seed(seed))
        .with_context(|| format!("Failed to set up game {}", game_number))?;

    let mut placements = 0u32;
    let mut rounds = 0u32;
    let mut on_event = |event: &GameEvent| match event {
        GameEvent::PiecePlaced { .. } => placements += 1,
        GameEvent::RoundEnded { .. } => rounds += 1,
        _ => {}
    };

    for event in controller.start() {
        on_event(&event);
    }
    while !controller.is_over() {
        let events = controller.play_ai_turn();
        if events.is_empty() {
            anyhow::bail!("Game {} stalled in round {}", game_number, controller.round());
        }
        events.iter().for_each(&mut on_event);
    }

    let outcome = controller
        .outcome()
        .copied()
        .with_context(|| format!("Game {} ended without an outcome", game_number))?;

    tracing::debug!(
        "Game {}: {:?} {}-{} after {} placements",
        game_number,
        outcome.result,
        outcome.totals[0],
        outcome.totals[1],
        placements
    );

    Ok(GameRecord {
        game_number,
        seed,
        winner: outcome.winner().map(Player::number),
        totals: outcome.totals,
        reason: outcome.reason,
        placements,
        rounds,
    })
}

/// Compute aggregate statistics from game records
pub fn compute_statistics(games: Vec<GameRecord>) -> SeriesResults {
    let count = |p: Player| games.iter().filter(|g| g.winner == Some(p.number())).count();
    let p1_wins = count(Player::One);
    let p2_wins = count(Player::Two);
    let ties = games.len() - p1_wins - p2_wins;

    let average = |f: &dyn Fn(&GameRecord) -> u32| {
        if games.is_empty() {
            0.0
        } else {
            games.iter().map(f).sum::<u32>() as f32 / games.len() as f32
        }
    };
    let avg_p1_score = average(&|g: &GameRecord| g.totals[0]);
    let avg_p2_score = average(&|g: &GameRecord| g.totals[1]);
    let avg_placements = average(&|g: &GameRecord| g.placements);

    SeriesResults {
        generated_at: Utc::now(),
        total_games: games.len(),
        p1_wins,
        p2_wins,
        ties,
        avg_p1_score,
        avg_p2_score,
        avg_placements,
        games,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Seed from the flag, or a fresh one that is reported for reruns
fn create_base_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(s) => s,
        None => ChaCha8Rng::from_entropy().gen(),
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos:>5}/{len:<5}  {percent:>3}%  {elapsed_precise}  {msg}",
    ) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

fn percent(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 * 100.0 / total as f32
    }
}

/// Print results as text
fn print_text_results(results: &SeriesResults) {
    let total = results.total_games;

    println!("\n=== Simulation Results ===");
    println!("Generated:   {}", results.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Total games: {}", total);
    println!(
        "P1 wins:     {} ({:.1}%)",
        results.p1_wins,
        percent(results.p1_wins, total)
    );
    println!(
        "P2 wins:     {} ({:.1}%)",
        results.p2_wins,
        percent(results.p2_wins, total)
    );
    println!("Ties:        {} ({:.1}%)", results.ties, percent(results.ties, total));
    println!(
        "Avg score:   P1 {:.1}  P2 {:.1}",
        results.avg_p1_score, results.avg_p2_score
    );
    println!("Avg placements per game: {:.1}", results.avg_placements);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> MatchConfig {
        let options = GameOptions {
            size: Some(3),
            ..GameOptions::default()
        };
        options
            .resolve(MatchConfig::versus(), None)
            .unwrap()
            .ai_vs_ai()
            .instant()
    }

    fn record(winner: Option<u8>, totals: [u32; 2]) -> GameRecord {
        GameRecord {
            game_number: 1,
            seed: 0,
            winner,
            totals,
            reason: EndReason::CapacityReached,
            placements: 27,
            rounds: 1,
        }
    }

    #[test]
    fn test_single_game_finishes() {
        let record = play_single_game(&small_config(), 1, 5).unwrap();
        assert!(record.placements >= 1);
        assert!(record.placements <= 27);
        assert_eq!(record.rounds, 1);
        match record.winner {
            Some(1) => assert!(record.totals[0] > record.totals[1]),
            Some(2) => assert!(record.totals[1] > record.totals[0]),
            None => assert_eq!(record.totals[0], record.totals[1]),
            Some(other) => panic!("unexpected winner {}", other),
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = small_config();
        let sequential = play_series(&config, 4, 100, false, None).unwrap();
        let parallel = play_series(&config, 4, 100, true, None).unwrap();

        let key = |g: &GameRecord| (g.game_number, g.seed, g.winner, g.totals, g.placements);
        assert_eq!(
            sequential.iter().map(key).collect::<Vec<_>>(),
            parallel.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_compute_statistics() {
        let results = compute_statistics(vec![
            record(Some(1), [6, 2]),
            record(Some(2), [0, 4]),
            record(None, [3, 3]),
            record(Some(1), [3, 3]),
        ]);
        assert_eq!(results.total_games, 4);
        assert_eq!(results.p1_wins, 2);
        assert_eq!(results.p2_wins, 1);
        assert_eq!(results.ties, 1);
        assert!((results.avg_p1_score - 3.0).abs() < 1e-6);
        assert!((results.avg_p2_score - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_base_seed_from_flag() {
        assert_eq!(create_base_seed(Some(17)), 17);
    }

    #[test]
    fn test_empty_statistics() {
        let results = compute_statistics(Vec::new());
        assert_eq!(results.total_games, 0);
        assert_eq!(results.avg_placements, 0.0);
        assert_eq!(percent(0, 0), 0.0);
    }
}
