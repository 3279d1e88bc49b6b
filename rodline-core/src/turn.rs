//! Turn state machine
//!
//! One controller covers every mode: the seats decide AI versus second human
//! and the round plan decides fixed versus progressive sizing. Offline the
//! controller is the authority itself; online it sits inside
//! [`crate::sync::Authority`].
//!
//! A placement walks `WaitingForInput → Locked → CascadeLoop → SwitchOrEnd`
//! and then either back to `WaitingForInput` or into the terminal `GameOver`.
//! The three steps are exposed separately ([`TurnController::begin_turn`],
//! [`TurnController::cascade_step`], [`TurnController::finish_turn`]) so an
//! async driver can pause between cascade passes; [`TurnController::submit`]
//! runs them back to back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::AiAgent;
use crate::board::{ActiveRegion, Board, Column, Player, Pos};
use crate::cascade::CascadeResolver;
use crate::config::{MatchConfig, Seat};
use crate::error::{ConfigError, PlacementError};
use crate::events::{GameEvent, GameObserver, Settlement};
use crate::score::{EndReason, Outcome, Scoreboard};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitingForInput,
    Locked,
    CascadeLoop,
    SwitchOrEnd,
    GameOver,
}

/// Turn view shared with mirrors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub active_player: Player,
    pub locked: bool,
    pub game_over: bool,
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct TurnController {
    config: MatchConfig,
    board: Board,
    scores: Scoreboard,
    resolver: CascadeResolver,
    agent: Option<AiAgent>,
    phase: Phase,
    active: Player,
    /// Player whose placement is being resolved
    trigger: Player,
    round: u32,
    used_cells: u32,
    capacity: u32,
    warned_last_moves: bool,
    outcome: Option<Outcome>,
    observers: Vec<Box<dyn GameObserver>>,
    settlement: Option<Box<dyn Settlement>>,
    started: bool,
}

impl TurnController {
    /// Build a controller for a validated config. Call [`Self::start`] to
    /// announce the first round.
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (size, height) = config.rounds.board_dims();
        let mut board = Board::new(size, height);
        let region = config
            .rounds
            .region(0)
            .unwrap_or(ActiveRegion::full(size, height));
        board.set_region(region);

        let agent = config
            .seats
            .contains(&Seat::Ai)
            .then(|| AiAgent::new(config.ai.clone(), config.directions));

        Ok(Self {
            resolver: CascadeResolver::new(config.directions, config.scoring),
            board,
            scores: Scoreboard::default(),
            agent,
            phase: Phase::WaitingForInput,
            active: Player::One,
            trigger: Player::One,
            round: 0,
            used_cells: 0,
            capacity: region.capacity(),
            warned_last_moves: false,
            outcome: None,
            observers: Vec::new(),
            settlement: None,
            started: false,
            config,
        })
    }

    pub fn with_observer(mut self, observer: impl GameObserver + 'static) -> Self {
        self.add_observer(observer);
        self
    }

    pub fn add_observer(&mut self, observer: impl GameObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn with_settlement(mut self, settlement: impl Settlement + 'static) -> Self {
        self.settlement = Some(Box::new(settlement));
        self
    }

    /// Announce round 0. Later calls do nothing.
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        if !self.started {
            self.started = true;
            self.start_round(0, &mut out);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_player(&self) -> Player {
        self.active
    }

    pub fn turn_state(&self) -> TurnState {
        TurnState {
            active_player: self.active,
            locked: self.phase != Phase::WaitingForInput,
            game_over: self.phase == Phase::GameOver,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn region(&self) -> ActiveRegion {
        self.board.region()
    }

    pub fn required_length(&self) -> u8 {
        self.resolver.detector.required_length(&self.board)
    }

    pub fn used_cells(&self) -> u32 {
        self.used_cells
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Placements left before the round ends
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.used_cells)
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn seat(&self, player: Player) -> Seat {
        self.config.seat(player)
    }

    // ------------------------------------------------------------------------
    // Placement steps
    // ------------------------------------------------------------------------

    /// Validate and apply a placement, locking input until the turn finishes.
    ///
    /// A rejection leaves every piece of state untouched.
    pub fn begin_turn(&mut self, player: Player, x: u8, z: u8) -> Result<GameEvent, PlacementError> {
        if !self.started {
            self.start();
        }
        match self.phase {
            Phase::GameOver => return Err(PlacementError::GameFinished),
            Phase::WaitingForInput => {}
            _ => return Err(PlacementError::RequestWhileLocked),
        }
        if player != self.active {
            return Err(PlacementError::NotYourTurn {
                requested: player,
                active: self.active,
            });
        }

        self.phase = Phase::Locked;
        let y = match self.board.place(x, z, player) {
            Ok(y) => y,
            Err(e) => {
                self.phase = Phase::WaitingForInput;
                debug!(?player, x, z, error = %e, "placement rejected");
                return Err(e);
            }
        };

        self.used_cells += 1;
        self.trigger = player;
        self.phase = Phase::CascadeLoop;
        debug!(?player, x, y, z, used = self.used_cells, "piece placed");

        let event = GameEvent::PiecePlaced {
            pos: Pos::new(x, y, z),
            player,
        };
        self.notify(&event);
        Ok(event)
    }

    /// Run one cascade pass for the triggering player.
    ///
    /// Returns `None` when nothing more clears; the turn is then ready for
    /// [`Self::finish_turn`].
    pub fn cascade_step(&mut self) -> Option<GameEvent> {
        if self.phase != Phase::CascadeLoop {
            return None;
        }
        let player = self.trigger;
        let Some(step) = self.resolver.step(&mut self.board, player) else {
            self.phase = Phase::SwitchOrEnd;
            return None;
        };

        self.scores.add(player, step.points);
        let event = GameEvent::CellsCleared {
            positions: step.cleared,
            falls: step.falls,
            player,
            score: self.scores.total(player),
        };
        self.notify(&event);
        Some(event)
    }

    /// Flip the turn, or end the round/game once capacity is used up.
    pub fn finish_turn(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        while self.phase == Phase::CascadeLoop {
            match self.cascade_step() {
                Some(event) => out.push(event),
                None => break,
            }
        }
        if self.phase != Phase::SwitchOrEnd {
            return out;
        }

        if self.used_cells >= self.capacity {
            self.end_round(EndReason::CapacityReached, &mut out);
        } else if self.board.valid_columns().is_empty() {
            warn!(round = self.round, "no legal rod left before capacity");
            self.end_round(EndReason::Stalemate, &mut out);
        } else {
            self.warn_last_moves(&mut out);
            self.active = self.active.opponent();
            self.phase = Phase::WaitingForInput;
            debug!(player = ?self.active, "turn changed");
            self.emit(GameEvent::TurnChanged { player: self.active }, &mut out);
        }
        out
    }

    /// Place, cascade to fixation and switch turn in one go
    pub fn submit(&mut self, player: Player, x: u8, z: u8) -> Result<Vec<GameEvent>, PlacementError> {
        let placed = self.begin_turn(player, x, z)?;
        let mut out = vec![placed];
        while let Some(event) = self.cascade_step() {
            out.push(event);
        }
        out.extend(self.finish_turn());
        Ok(out)
    }

    /// Offline input: place for the active human, then let AI seats answer
    pub fn play(&mut self, x: u8, z: u8) -> Result<Vec<GameEvent>, PlacementError> {
        if self.seat(self.active) == Seat::Ai && !self.is_over() {
            return Err(PlacementError::NotYourTurn {
                requested: self.active.opponent(),
                active: self.active,
            });
        }
        let mut out = self.submit(self.active, x, z)?;
        out.extend(self.run_ai_turns());
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // AI seats
    // ------------------------------------------------------------------------

    pub fn ai_to_move(&self) -> bool {
        self.started
            && self.phase == Phase::WaitingForInput
            && self.seat(self.active) == Seat::Ai
    }

    /// Pause an async driver should take before the AI commits
    pub fn ai_thinking_delay(&mut self) -> Duration {
        self.agent
            .as_mut()
            .map_or(Duration::ZERO, AiAgent::thinking_delay)
    }

    pub fn choose_ai_move(&mut self) -> Option<Column> {
        let player = self.active;
        self.agent.as_mut()?.choose_move(&self.board, player)
    }

    /// Play one AI turn if an AI seat is to move
    pub fn play_ai_turn(&mut self) -> Vec<GameEvent> {
        if !self.ai_to_move() {
            return Vec::new();
        }
        let player = self.active;
        let Some((x, z)) = self.choose_ai_move() else {
            let mut out = Vec::new();
            self.phase = Phase::SwitchOrEnd;
            self.end_round(EndReason::Stalemate, &mut out);
            return out;
        };
        match self.submit(player, x, z) {
            Ok(events) => events,
            Err(e) => {
                warn!(?player, x, z, error = %e, "ai chose an illegal rod");
                Vec::new()
            }
        }
    }

    /// Keep playing while an AI seat is to move
    pub fn run_ai_turns(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        while self.ai_to_move() {
            let events = self.play_ai_turn();
            if events.is_empty() {
                break;
            }
            out.extend(events);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Rounds and termination
    // ------------------------------------------------------------------------

    /// A peer left: end immediately as a tie
    pub fn end_by_disconnect(&mut self) -> Vec<GameEvent> {
        let mut out = Vec::new();
        if self.is_over() {
            return out;
        }
        info!(round = self.round, "peer disconnected, ending as a tie");
        self.finish_game(Outcome::disconnected(self.scores.totals()), &mut out);
        out
    }

    fn start_round(&mut self, round: u32, out: &mut Vec<GameEvent>) {
        let Some(region) = self.config.rounds.region(round) else {
            self.finish_game(
                Outcome::from_totals(self.scores.totals(), EndReason::CapacityReached),
                out,
            );
            return;
        };

        self.round = round;
        self.board.set_region(region);
        self.capacity = region.capacity();
        // Pieces persist between rounds, so count what is already there
        self.used_cells = self.board.occupied_count();
        self.warned_last_moves = false;
        self.active = Player::One;
        self.trigger = Player::One;

        info!(
            round,
            side = region.side,
            capacity = self.capacity,
            used = self.used_cells,
            "round started"
        );
        self.emit(
            GameEvent::RoundStarted {
                round,
                region,
                required_length: region.side,
                capacity: self.capacity,
                used_cells: self.used_cells,
            },
            out,
        );

        if self.used_cells >= self.capacity {
            self.phase = Phase::SwitchOrEnd;
            self.end_round(EndReason::CapacityReached, out);
            return;
        }

        self.phase = Phase::WaitingForInput;
        self.warn_last_moves(out);
        self.emit(GameEvent::TurnChanged { player: self.active }, out);
    }

    fn end_round(&mut self, reason: EndReason, out: &mut Vec<GameEvent>) {
        let round_scores = self.scores.bank_round();
        let totals = self.scores.totals();
        info!(round = self.round, ?round_scores, ?totals, ?reason, "round ended");
        self.emit(
            GameEvent::RoundEnded {
                round: self.round,
                round_scores,
                totals,
            },
            out,
        );

        if self.round + 1 < self.config.rounds.round_count() {
            self.start_round(self.round + 1, out);
        } else {
            self.finish_game(Outcome::from_totals(totals, reason), out);
        }
    }

    fn finish_game(&mut self, outcome: Outcome, out: &mut Vec<GameEvent>) {
        self.phase = Phase::GameOver;
        self.outcome = Some(outcome);
        info!(result = ?outcome.result, totals = ?outcome.totals, "game over");
        self.emit(GameEvent::GameEnded { outcome }, out);
    }

    fn warn_last_moves(&mut self, out: &mut Vec<GameEvent>) {
        let remaining = self.remaining();
        if remaining == 2 && !self.warned_last_moves {
            self.warned_last_moves = true;
            self.emit(GameEvent::LastMoves { remaining }, out);
        }
    }

    fn emit(&mut self, event: GameEvent, out: &mut Vec<GameEvent>) {
        self.notify(&event);
        out.push(event);
    }

    fn notify(&mut self, event: &GameEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
        if let GameEvent::GameEnded { outcome } = event {
            if let Some(settlement) = self.settlement.as_mut() {
                settlement.settle(outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoundPlan;
    use crate::score::GameResult;
    use std::sync::{Arc, Mutex};

    fn versus(size: u8) -> TurnController {
        let mut config = MatchConfig::versus().instant();
        config.rounds = RoundPlan::Fixed { size, height: size };
        let mut tc = TurnController::new(config).unwrap();
        tc.start();
        tc
    }

    #[test]
    fn test_start_announces_round_once() {
        let mut tc = TurnController::new(MatchConfig::versus()).unwrap();
        let events = tc.start();
        assert!(matches!(events[0], GameEvent::RoundStarted { round: 0, capacity: 125, .. }));
        assert_eq!(events[1], GameEvent::TurnChanged { player: Player::One });
        assert!(tc.start().is_empty());
    }

    #[test]
    fn test_turns_alternate() {
        let mut tc = versus(5);
        tc.submit(Player::One, 0, 0).unwrap();
        assert_eq!(tc.active_player(), Player::Two);
        let events = tc.submit(Player::Two, 1, 0).unwrap();
        assert_eq!(events.last(), Some(&GameEvent::TurnChanged { player: Player::One }));
        assert_eq!(tc.used_cells(), 2);
    }

    #[test]
    fn test_wrong_player_rejected() {
        let mut tc = versus(5);
        let err = tc.submit(Player::Two, 0, 0).unwrap_err();
        assert_eq!(
            err,
            PlacementError::NotYourTurn {
                requested: Player::Two,
                active: Player::One
            }
        );
        assert_eq!(tc.board().occupied_count(), 0);
        assert_eq!(tc.phase(), Phase::WaitingForInput);
    }

    #[test]
    fn test_locked_during_resolution() {
        let mut tc = versus(5);
        tc.begin_turn(Player::One, 2, 2).unwrap();
        assert!(tc.turn_state().locked);
        assert_eq!(
            tc.begin_turn(Player::One, 2, 2),
            Err(PlacementError::RequestWhileLocked)
        );
        assert_eq!(tc.cascade_step(), None);
        tc.finish_turn();
        assert!(!tc.turn_state().locked);
        assert_eq!(tc.active_player(), Player::Two);
    }

    #[test]
    fn test_rejected_placement_keeps_state() {
        let mut tc = TurnController::new(MatchConfig::progressive().instant()).unwrap();
        tc.start();
        assert_eq!(
            tc.submit(Player::One, 0, 0),
            Err(PlacementError::OutOfActiveRegion { x: 0, z: 0 })
        );
        assert_eq!(tc.used_cells(), 0);
        assert_eq!(tc.active_player(), Player::One);
    }

    #[test]
    fn test_clear_keeps_turn_until_cascade_ends() {
        let mut tc = versus(3);
        // One builds a vertical line on (0,0); Two plays elsewhere
        tc.submit(Player::One, 0, 0).unwrap();
        tc.submit(Player::Two, 2, 0).unwrap();
        tc.submit(Player::One, 0, 0).unwrap();
        tc.submit(Player::Two, 2, 2).unwrap();

        tc.begin_turn(Player::One, 0, 0).unwrap();
        let cleared = tc.cascade_step().unwrap();
        assert!(matches!(cleared, GameEvent::CellsCleared { score: 3, .. }));
        assert_eq!(tc.active_player(), Player::One);
        assert_eq!(tc.cascade_step(), None);
        tc.finish_turn();
        assert_eq!(tc.active_player(), Player::Two);
        assert_eq!(tc.scores().total(Player::One), 3);
    }

    #[test]
    fn test_capacity_ends_game() {
        let mut tc = versus(1);
        let events = tc.submit(Player::One, 0, 0).unwrap();
        assert!(tc.is_over());
        let outcome = tc.outcome().copied().unwrap();
        assert_eq!(outcome.result, GameResult::Winner(Player::One));
        assert_eq!(outcome.reason, EndReason::CapacityReached);
        assert!(events.last().unwrap().is_terminal());
        assert_eq!(tc.submit(Player::Two, 0, 0), Err(PlacementError::GameFinished));
    }

    #[test]
    fn test_disconnect_is_terminal_tie() {
        let mut tc = versus(5);
        tc.submit(Player::One, 0, 0).unwrap();
        let events = tc.end_by_disconnect();
        assert_eq!(events.len(), 1);
        assert_eq!(tc.outcome().unwrap().result, GameResult::Tie);
        assert!(tc.end_by_disconnect().is_empty());
        assert_eq!(tc.submit(Player::Two, 1, 1), Err(PlacementError::GameFinished));
    }

    #[test]
    fn test_observer_and_settlement() {
        struct Ledger(Arc<Mutex<Vec<Outcome>>>);
        impl Settlement for Ledger {
            fn settle(&mut self, outcome: &Outcome) {
                self.0.lock().unwrap().push(*outcome);
            }
        }

        let seen = Arc::new(Mutex::new(0usize));
        let settled = Arc::new(Mutex::new(Vec::new()));
        let counter = seen.clone();

        let mut config = MatchConfig::versus().instant();
        config.rounds = RoundPlan::Fixed { size: 1, height: 1 };
        let mut tc = TurnController::new(config)
            .unwrap()
            .with_observer(move |_: &GameEvent| *counter.lock().unwrap() += 1)
            .with_settlement(Ledger(settled.clone()));

        // RoundStarted, TurnChanged, PiecePlaced, CellsCleared, RoundEnded, GameEnded
        tc.submit(Player::One, 0, 0).unwrap();
        tc.end_by_disconnect();
        assert_eq!(*seen.lock().unwrap(), 6);
        assert_eq!(settled.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_play_lets_ai_answer() {
        let config = MatchConfig::single_player().instant().with_seed(4);
        let mut tc = TurnController::new(config).unwrap();
        tc.start();
        let events = tc.play(2, 2).unwrap();
        assert_eq!(tc.active_player(), Player::One);
        assert_eq!(tc.used_cells(), 2);
        let placed = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PiecePlaced { .. }))
            .count();
        assert_eq!(placed, 2);
    }

    #[test]
    fn test_ai_vs_ai_finishes() {
        let config = MatchConfig::single_player().ai_vs_ai().instant().with_seed(8);
        let mut tc = TurnController::new(config).unwrap();
        tc.start();
        tc.run_ai_turns();
        assert!(tc.is_over());
        assert_eq!(tc.used_cells(), 125);
        assert!(tc.board().is_settled());
    }
}
