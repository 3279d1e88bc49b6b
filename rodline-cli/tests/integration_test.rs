//! Integration tests for rodline
//!
//! Tests the full stack: rules engine, AI seats, authority/mirror sync and
//! the async server driver, all with complete AI-vs-AI games.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rodline_core::{
    sync::{Authority, Mirror, Origin},
    DirectionSet, EndReason, GameEvent, GameResult, MatchConfig, Outcome, RoundPlan,
    ScoringPolicy, TurnController,
};
use rodline_server::ServerState;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn ai_game(config: MatchConfig, seed: u64) -> MatchConfig {
    config.ai_vs_ai().instant().with_seed(seed)
}

/// Play to the end, collecting every event
fn play_out(config: MatchConfig) -> (TurnController, Vec<GameEvent>) {
    let mut controller = TurnController::new(config).unwrap();
    let mut events = controller.start();
    events.extend(controller.run_ai_turns());
    assert!(controller.is_over(), "game should finish");
    (controller, events)
}

fn assert_consistent(outcome: &Outcome) {
    match outcome.result {
        GameResult::Winner(p) => {
            assert!(outcome.totals[p.index()] > outcome.totals[p.opponent().index()])
        }
        GameResult::Tie => assert_eq!(outcome.totals[0], outcome.totals[1]),
    }
}

// ============================================================================
// FULL GAMES
// ============================================================================

#[test]
fn test_fixed_game_runs_to_capacity_or_stalemate() {
    let (controller, events) = play_out(ai_game(MatchConfig::versus(), 1));
    let outcome = controller.outcome().unwrap();

    assert_consistent(outcome);
    assert!(matches!(
        outcome.reason,
        EndReason::CapacityReached | EndReason::Stalemate
    ));
    assert!(controller.used_cells() <= 125);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().unwrap().is_terminal());
}

#[test]
fn test_scores_match_cleared_events() {
    let (controller, events) = play_out(ai_game(MatchConfig::versus(), 8));

    let mut last = [0u32; 2];
    for event in &events {
        if let GameEvent::CellsCleared { player, score, .. } = event {
            assert!(*score > last[player.index()]);
            last[player.index()] = *score;
        }
    }
    assert_eq!(last, controller.scores().totals());
}

#[test]
fn test_same_seed_same_game() {
    let (_, a) = play_out(ai_game(MatchConfig::versus(), 77));
    let (_, b) = play_out(ai_game(MatchConfig::versus(), 77));
    assert_eq!(a, b);
}

#[test]
fn test_random_seeds_small_boards() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for _ in 0..8 {
        let seed: u64 = rng.gen();
        let size = rng.gen_range(2..=4);
        let mut config = ai_game(MatchConfig::versus(), seed);
        config.rounds = RoundPlan::Fixed { size, height: size };

        let (controller, _) = play_out(config);
        let outcome = controller.outcome().unwrap();
        assert_consistent(outcome);
        assert!(controller.used_cells() <= (size as u32).pow(3));
    }
}

#[test]
fn test_progressive_game_plays_every_round() {
    let (controller, events) = play_out(ai_game(MatchConfig::progressive(), 4));

    let started: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::RoundStarted { round, .. } => Some(*round),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![0, 1, 2]);
    assert_eq!(controller.round(), 2);
    assert_consistent(controller.outcome().unwrap());
}

#[test]
fn test_spatial_per_run_game() {
    let mut config = ai_game(MatchConfig::versus(), 3);
    config.rounds = RoundPlan::Fixed { size: 4, height: 4 };
    config.directions = DirectionSet::Spatial;
    config.scoring = ScoringPolicy::PerRun;

    let (controller, _) = play_out(config);
    assert_consistent(controller.outcome().unwrap());
}

#[test]
fn test_settlement_runs_once() {
    let settled = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&settled);

    struct Recorder(Arc<Mutex<Vec<Outcome>>>);
    impl rodline_core::Settlement for Recorder {
        fn settle(&mut self, outcome: &Outcome) {
            self.0.lock().unwrap().push(*outcome);
        }
    }

    let mut controller = TurnController::new(ai_game(MatchConfig::versus(), 12))
        .unwrap()
        .with_settlement(Recorder(sink));
    controller.start();
    controller.run_ai_turns();

    let settled = settled.lock().unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(Some(&settled[0]), controller.outcome());
}

// ============================================================================
// SYNCHRONIZED PLAY
// ============================================================================

#[test]
fn test_spectator_mirror_follows_progressive_ai_game() {
    let mut authority = Authority::new(ai_game(MatchConfig::progressive(), 21)).unwrap();
    let ack = authority.join(Origin::Remote("watcher".into()));
    assert_eq!(ack.seat, None);

    let mut mirror = Mirror::from_snapshot("watcher", ack.seat, &ack.snapshot).unwrap();
    // A second spectator that only catches up at the end
    let late = authority.join(Origin::Remote("late".into()));
    let mut late_mirror = Mirror::from_snapshot("late", late.seat, &late.snapshot).unwrap();

    while !authority.controller().is_over() {
        let deltas = authority.play_ai_turn();
        assert!(!deltas.is_empty());
        mirror.apply_catchup(&authority.catch_up(mirror.last_seq())).unwrap();
    }
    late_mirror
        .apply_catchup(&authority.catch_up(late_mirror.last_seq()))
        .unwrap();

    for m in [&mirror, &late_mirror] {
        assert_eq!(m.board(), authority.controller().board());
        assert_eq!(m.scores().totals(), authority.controller().scores().totals());
        assert_eq!(m.outcome(), authority.controller().outcome());
        assert_eq!(m.last_seq(), authority.latest_seq());
    }
}

#[tokio::test]
async fn test_server_driver_plays_ai_session() {
    let state = Arc::new(ServerState::new(ai_game(MatchConfig::versus(), 5)).unwrap());
    state.drive().await;

    let authority = state.authority();
    assert!(authority.controller().is_over());
    let snapshot = authority.snapshot();
    assert!(snapshot.turn.game_over);
    assert_eq!(snapshot.seq, authority.latest_seq());
    assert_consistent(snapshot.outcome.as_ref().unwrap());
}
