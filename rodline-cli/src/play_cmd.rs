//! Play command - a game on the terminal
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_match(), play_loop(), report_outcome()
//! - Level 3: human_turn(), ai_turn(), parse_input()
//! - Level 4: event and board formatting

use std::io::{self, BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use clap::Args;

use rodline_core::{GameEvent, MatchConfig, Outcome, Player, TurnController};

use crate::options::GameOptions;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    pub options: GameOptions,

    /// Two humans sharing the terminal instead of playing the AI
    #[arg(long)]
    pub hot_seat: bool,

    /// Let the AI answer without its thinking pause
    #[arg(long)]
    pub no_delay: bool,
}

/// One line of player input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Input {
    Move(u8, u8),
    Board,
    Quit,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// This function reads like a table of contents:
/// 1. Build the match configuration
/// 2. Alternate human and AI turns until the game ends or input closes
/// 3. Report the outcome
pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let config = configure_match(&args, seed)?;

    tracing::info!(
        "Starting game: {} ({:?} scoring, {:?} directions)",
        config.name,
        config.scoring,
        config.directions
    );

    let mut controller = TurnController::new(config).context("Failed to set up game")?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    play_loop(&mut controller, stdin.lock(), &mut stdout, !args.no_delay)?;
    report_outcome(controller.outcome(), &mut stdout)?;

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn configure_match(args: &PlayArgs, seed: Option<u64>) -> Result<MatchConfig> {
    let preset = if args.hot_seat {
        MatchConfig::versus()
    } else {
        MatchConfig::single_player()
    };
    args.options.resolve(preset, seed)
}

/// Drive the game from `input` until it ends, the input closes or the
/// player quits
fn play_loop(
    controller: &mut TurnController,
    input: impl BufRead,
    out: &mut impl Write,
    pause_for_ai: bool,
) -> Result<()> {
    let events = controller.start();
    print_events(&events, out)?;
    print_board(controller, out)?;

    let mut lines = input.lines();
    while !controller.is_over() {
        if controller.ai_to_move() {
            if !ai_turn(controller, out, pause_for_ai)? {
                break;
            }
            continue;
        }

        let player = controller.active_player();
        write!(out, "Player {} (x z)> ", player.number())?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            tracing::info!("input closed, leaving game");
            break;
        };
        match parse_input(&line?) {
            Ok(Input::Move(x, z)) => human_turn(controller, player, x, z, out)?,
            Ok(Input::Board) => print_board(controller, out)?,
            Ok(Input::Quit) => break,
            Err(e) => writeln!(out, "{}", e)?,
        }
    }

    Ok(())
}

fn report_outcome(outcome: Option<&Outcome>, out: &mut impl Write) -> Result<()> {
    if outcome.is_none() {
        writeln!(out, "Game abandoned.")?;
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn human_turn(
    controller: &mut TurnController,
    player: Player,
    x: u8,
    z: u8,
    out: &mut impl Write,
) -> Result<()> {
    match controller.submit(player, x, z) {
        Ok(events) => {
            print_events(&events, out)?;
            print_board(controller, out)?;
        }
        Err(e) => writeln!(out, "Rejected: {}", e)?,
    }
    Ok(())
}

/// Returns false if the AI could not act
fn ai_turn(controller: &mut TurnController, out: &mut impl Write, pause: bool) -> Result<bool> {
    let delay = controller.ai_thinking_delay();
    if pause {
        thread::sleep(delay);
    }
    let events = controller.play_ai_turn();
    if events.is_empty() {
        return Ok(false);
    }
    print_events(&events, out)?;
    print_board(controller, out)?;
    Ok(true)
}

fn parse_input(line: &str) -> Result<Input> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["q"] | ["quit"] => Ok(Input::Quit),
        ["b"] | ["board"] => Ok(Input::Board),
        [x, z] => {
            let x = x.parse().with_context(|| format!("Bad x coordinate: {}", x))?;
            let z = z.parse().with_context(|| format!("Bad z coordinate: {}", z))?;
            Ok(Input::Move(x, z))
        }
        _ => anyhow::bail!("Enter a rod as `x z`, `board` or `quit`"),
    }
}

// ============================================================================
// LEVEL 4 - FORMATTING
// ============================================================================

fn print_events(events: &[GameEvent], out: &mut impl Write) -> Result<()> {
    for event in events {
        if let Some(line) = describe(event) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

fn print_board(controller: &TurnController, out: &mut impl Write) -> Result<()> {
    let totals = controller.scores().totals();
    writeln!(out, "{}", controller.board().render())?;
    writeln!(
        out,
        "Score: P1 {}  P2 {}   ({} of {} cells used)",
        totals[0],
        totals[1],
        controller.used_cells(),
        controller.capacity()
    )?;
    Ok(())
}

fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::RoundStarted {
            round,
            region,
            required_length,
            capacity,
            ..
        } => format!(
            "Round {}: {}x{}x{} region, connect {} ({} cells)",
            round + 1,
            region.side,
            region.side,
            region.height,
            required_length,
            capacity
        ),
        GameEvent::PiecePlaced { pos, player } => format!(
            "Player {} drops on ({}, {}) at height {}",
            player.number(),
            pos.x,
            pos.z,
            pos.y
        ),
        GameEvent::CellsCleared {
            positions,
            player,
            score,
            ..
        } => format!(
            "Player {} clears {} cells (score {})",
            player.number(),
            positions.len(),
            score
        ),
        GameEvent::LastMoves { remaining } => format!("Last {} moves of the round!", remaining),
        GameEvent::TurnChanged { .. } => return None,
        GameEvent::RoundEnded {
            round,
            round_scores,
            ..
        } => format!(
            "Round {} over: P1 {}  P2 {}",
            round + 1,
            round_scores[0],
            round_scores[1]
        ),
        GameEvent::GameEnded { outcome } => match outcome.winner() {
            Some(player) => format!(
                "Game over: Player {} wins {}-{}",
                player.number(),
                outcome.totals[0],
                outcome.totals[1]
            ),
            None => format!("Game over: tie {}-{}", outcome.totals[0], outcome.totals[1]),
        },
    };
    Some(text)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn play_script(config: MatchConfig, script: &str) -> (TurnController, String) {
        let mut controller = TurnController::new(config).unwrap();
        let mut out = Vec::new();
        play_loop(&mut controller, Cursor::new(script.to_string()), &mut out, false).unwrap();
        (controller, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("2 3").unwrap(), Input::Move(2, 3));
        assert_eq!(parse_input("  0   4 ").unwrap(), Input::Move(0, 4));
        assert_eq!(parse_input("quit").unwrap(), Input::Quit);
        assert_eq!(parse_input("b").unwrap(), Input::Board);
        assert!(parse_input("2").is_err());
        assert!(parse_input("a b").is_err());
        assert!(parse_input("-1 0").is_err());
    }

    #[test]
    fn test_hot_seat_row_clear() {
        let script = "0 0\n0 4\n1 0\n1 4\n2 0\n2 4\n3 0\n3 4\n4 0\nquit\n";
        let (controller, output) = play_script(MatchConfig::versus().instant(), script);

        assert_eq!(controller.scores().total(Player::One), 5);
        assert_eq!(controller.scores().total(Player::Two), 0);
        assert!(output.contains("Player 1 clears 5 cells (score 5)"));
        assert!(output.contains("Round 1: 5x5x5 region, connect 5"));
    }

    #[test]
    fn test_rejections_are_reported() {
        let script = "9 9\nhello\n";
        let (controller, output) = play_script(MatchConfig::versus().instant(), script);

        assert!(output.contains("Rejected:"));
        assert!(output.contains("Enter a rod"));
        assert_eq!(controller.board().occupied_count(), 0);
    }

    #[test]
    fn test_ai_answers_each_move() {
        let config = MatchConfig::single_player().instant().with_seed(3);
        let (controller, output) = play_script(config, "2 2\n");

        assert_eq!(controller.board().occupied_count(), 2);
        assert!(output.contains("Player 2 drops on"));
        assert_eq!(controller.active_player(), Player::One);
    }

    #[test]
    fn test_configure_match_presets() {
        let args = PlayArgs {
            options: GameOptions::default(),
            hot_seat: true,
            no_delay: true,
        };
        let config = configure_match(&args, Some(1)).unwrap();
        assert_eq!(config.seats, MatchConfig::versus().seats);
        assert_eq!(config.ai.seed, Some(1));
    }
}
