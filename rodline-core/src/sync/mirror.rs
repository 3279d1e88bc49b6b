//! Read-only mirror kept by a remote peer
//!
//! The mirror never mutates its board from local input. Input only produces a
//! [`ClientMessage::Place`] for the authority and locks further input until
//! the authority answers.

use tracing::debug;

use super::protocol::{Catchup, ClientMessage, PeerId, Reply, RequestId, Sequenced, Snapshot};
use crate::board::{ActiveRegion, Board, Player, Pos};
use crate::error::{PlacementError, SyncError};
use crate::events::GameEvent;
use crate::score::{Outcome, Scoreboard};
use crate::turn::TurnState;

pub struct Mirror {
    peer: PeerId,
    seat: Option<Player>,
    board: Board,
    scores: Scoreboard,
    turn: TurnState,
    round: u32,
    used_cells: u32,
    capacity: u32,
    last_moves: Option<u32>,
    outcome: Option<Outcome>,
    last_seq: u64,
    awaiting: Option<RequestId>,
    next_request_id: RequestId,
}

impl Mirror {
    pub fn from_snapshot(
        peer: impl Into<PeerId>,
        seat: Option<Player>,
        snapshot: &Snapshot,
    ) -> Result<Self, SyncError> {
        let mut mirror = Self {
            peer: peer.into(),
            seat,
            board: snapshot.to_board()?,
            scores: Scoreboard::default(),
            turn: snapshot.turn,
            round: 0,
            used_cells: 0,
            capacity: 0,
            last_moves: None,
            outcome: None,
            last_seq: 0,
            awaiting: None,
            next_request_id: 1,
        };
        mirror.apply_snapshot(snapshot)?;
        Ok(mirror)
    }

    /// Replace local state wholesale. A snapshot that does not describe a
    /// valid board leaves the mirror untouched.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SyncError> {
        self.board = snapshot.to_board()?;
        self.scores = snapshot.scores;
        self.turn = snapshot.turn;
        self.round = snapshot.round;
        self.used_cells = snapshot.used_cells;
        self.capacity = snapshot.capacity;
        self.outcome = snapshot.outcome;
        self.last_seq = snapshot.seq;
        if self.turn.game_over {
            self.awaiting = None;
        }
        debug!(peer = %self.peer, seq = snapshot.seq, "snapshot applied");
        Ok(())
    }

    /// Apply the next delta. Already-seen deltas are skipped (`Ok(false)`);
    /// a hole in the sequence is an error and the caller should catch up.
    pub fn apply(&mut self, delta: &Sequenced) -> Result<bool, SyncError> {
        if delta.seq <= self.last_seq {
            return Ok(false);
        }
        if delta.seq != self.last_seq + 1 {
            return Err(SyncError::SequenceGap {
                expected: self.last_seq + 1,
                got: delta.seq,
            });
        }
        self.check_event(&delta.event)?;
        self.apply_event(&delta.event);
        self.last_seq = delta.seq;
        Ok(true)
    }

    pub fn apply_all(&mut self, deltas: &[Sequenced]) -> Result<(), SyncError> {
        for delta in deltas {
            self.apply(delta)?;
        }
        Ok(())
    }

    pub fn apply_catchup(&mut self, catchup: &Catchup) -> Result<(), SyncError> {
        if let Catchup::Snapshot { snapshot, .. } = catchup {
            if snapshot.seq > self.last_seq {
                self.apply_snapshot(snapshot)?;
            }
        }
        self.apply_all(catchup.deltas())
    }

    /// Refuse a delta that points outside the mirrored board
    fn check_event(&self, event: &GameEvent) -> Result<(), SyncError> {
        let (size, height) = (self.board.size(), self.board.height());
        let off_board = |pos: &Pos| !self.board.in_bounds(*pos);
        let bad = match event {
            GameEvent::RoundStarted { region, .. } => !region.fits(size, height),
            GameEvent::PiecePlaced { pos, .. } => off_board(pos),
            GameEvent::CellsCleared {
                positions, falls, ..
            } => {
                positions.iter().any(off_board)
                    || falls.iter().any(|f| off_board(&f.from) || off_board(&f.to))
            }
            _ => false,
        };
        if bad {
            return Err(SyncError::Malformed(format!(
                "{:?} does not fit a {}x{}x{} board",
                event, size, size, height
            )));
        }
        Ok(())
    }

    fn apply_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::RoundStarted {
                round,
                region,
                capacity,
                used_cells,
                ..
            } => {
                self.round = *round;
                self.set_region(*region);
                self.capacity = *capacity;
                self.used_cells = *used_cells;
                self.last_moves = None;
                self.turn.active_player = Player::One;
            }
            GameEvent::PiecePlaced { pos, player } => {
                self.board.set(*pos, Some(*player));
                self.used_cells += 1;
                self.turn.locked = true;
            }
            GameEvent::CellsCleared {
                positions,
                falls,
                player,
                score,
            } => {
                self.board.clear(positions);
                self.board.apply_falls(falls);
                let i = player.index();
                self.scores.round[i] = score.saturating_sub(self.scores.banked[i]);
            }
            GameEvent::LastMoves { remaining } => {
                self.last_moves = Some(*remaining);
            }
            GameEvent::TurnChanged { player } => {
                self.turn.active_player = *player;
                self.turn.locked = false;
                self.awaiting = None;
            }
            GameEvent::RoundEnded { totals, .. } => {
                self.scores.banked = *totals;
                self.scores.round = [0, 0];
            }
            GameEvent::GameEnded { outcome } => {
                self.outcome = Some(*outcome);
                self.turn.game_over = true;
                self.turn.locked = true;
                self.awaiting = None;
            }
        }
    }

    fn set_region(&mut self, region: ActiveRegion) {
        self.board.set_region(region);
    }

    /// Check a placement locally and turn it into a request for the
    /// authority. Input stays locked until the reply arrives.
    pub fn request_placement(&mut self, x: u8, z: u8) -> Result<ClientMessage, PlacementError> {
        if self.turn.game_over {
            return Err(PlacementError::GameFinished);
        }
        if self.awaiting.is_some() || self.turn.locked {
            return Err(PlacementError::RequestWhileLocked);
        }
        if let Some(seat) = self.seat {
            if seat != self.turn.active_player {
                return Err(PlacementError::NotYourTurn {
                    requested: seat,
                    active: self.turn.active_player,
                });
            }
        }
        self.board.landing_height(x, z)?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.awaiting = Some(request_id);
        Ok(ClientMessage::Place {
            peer: self.peer.clone(),
            request_id,
            x,
            z,
        })
    }

    /// Withdraw the outstanding request, if any
    pub fn cancel_request(&self) -> Option<ClientMessage> {
        self.awaiting.map(|request_id| ClientMessage::Cancel {
            peer: self.peer.clone(),
            request_id,
        })
    }

    /// Handle the authority's answer to our request
    pub fn on_reply(&mut self, reply: &Reply) -> Result<(), SyncError> {
        if self.awaiting != Some(reply.request_id()) {
            return Err(SyncError::UnknownRequest);
        }
        self.awaiting = None;
        match reply {
            Reply::Accepted { deltas, .. } => self.apply_all(deltas),
            Reply::Rejected { reason, .. } => {
                debug!(peer = %self.peer, ?reason, "request rejected");
                Ok(())
            }
            Reply::Cancelled { .. } => Ok(()),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn seat(&self) -> Option<Player> {
        self.seat
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn used_cells(&self) -> u32 {
        self.used_cells
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn last_moves(&self) -> Option<u32> {
        self.last_moves
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// True while a request is out and unanswered
    pub fn is_input_locked(&self) -> bool {
        self.awaiting.is_some() || self.turn.locked || self.turn.game_over
    }

    pub fn is_my_turn(&self) -> bool {
        !self.is_input_locked() && self.seat == Some(self.turn.active_player)
    }
}
