//! Authoritative side of a networked session

use std::time::Duration;

use tracing::{debug, info};

use super::log::DeltaLog;
use super::protocol::{Catchup, Origin, PendingRequest, RejectReason, Reply, Sequenced, Snapshot};
use crate::board::Player;
use crate::config::{MatchConfig, Seat};
use crate::error::ConfigError;
use crate::events::GameEvent;
use crate::turn::TurnController;

/// Answer to a join
#[derive(Clone, Debug)]
pub struct JoinAck {
    pub seat: Option<Player>,
    pub snapshot: Snapshot,
}

/// Owns the canonical controller, seats peers and sequences every event.
///
/// Requests are processed one at a time: [`Authority::begin`] through
/// [`Authority::finish`] must complete before the next `begin`, which the
/// controller's lock enforces.
pub struct Authority {
    controller: TurnController,
    seats: [Option<Origin>; 2],
    log: DeltaLog,
}

impl Authority {
    /// Host with no local player; human seats go to remote joiners
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        Self::build(config, false)
    }

    /// Host that plays Player One from its own process
    pub fn with_local_host(config: MatchConfig) -> Result<Self, ConfigError> {
        Self::build(config, true)
    }

    fn build(config: MatchConfig, local_host: bool) -> Result<Self, ConfigError> {
        let mut controller = TurnController::new(config)?;
        let log = DeltaLog::new(Snapshot::capture(&controller, 0));

        let mut seats = [None, None];
        if local_host && controller.seat(Player::One) == Seat::Human {
            seats[0] = Some(Origin::Local);
        }

        let start = controller.start();
        let mut authority = Self {
            controller,
            seats,
            log,
        };
        authority.record(start);
        Ok(authority)
    }

    pub fn controller(&self) -> &TurnController {
        &self.controller
    }

    pub fn seat_of(&self, origin: &Origin) -> Option<Player> {
        [Player::One, Player::Two]
            .into_iter()
            .find(|p| self.seats[p.index()].as_ref() == Some(origin))
    }

    /// Seat a peer in the first free human seat, or as a spectator.
    ///
    /// A peer that already holds a seat gets it back.
    pub fn join(&mut self, origin: Origin) -> JoinAck {
        let seat = self.seat_of(&origin).or_else(|| {
            let free = [Player::One, Player::Two].into_iter().find(|p| {
                self.seats[p.index()].is_none() && self.controller.seat(*p) == Seat::Human
            })?;
            self.seats[free.index()] = Some(origin.clone());
            Some(free)
        });
        info!(?origin, ?seat, "peer joined");
        JoinAck {
            seat,
            snapshot: self.snapshot(),
        }
    }

    /// Validate and apply a placement. A rejection is returned as the reply
    /// for the requester only.
    pub fn begin(&mut self, request: &PendingRequest) -> Result<Vec<Sequenced>, Reply> {
        let Some(player) = self.seat_of(&request.origin) else {
            debug!(origin = ?request.origin, "request from unseated peer");
            return Err(Reply::rejected(request.request_id, RejectReason::NotSeated));
        };
        let placed = self
            .controller
            .begin_turn(player, request.x, request.z)
            .map_err(|e| Reply::rejected(request.request_id, e))?;
        Ok(self.record(vec![placed]))
    }

    /// One cascade pass of the request in flight
    pub fn cascade_step(&mut self) -> Option<Sequenced> {
        let event = self.controller.cascade_step()?;
        self.record(vec![event]).pop()
    }

    /// Turn change, or round/game end, for the request in flight
    pub fn finish(&mut self) -> Vec<Sequenced> {
        let events = self.controller.finish_turn();
        self.record(events)
    }

    /// Handle a request to completion with no pauses
    pub fn handle_request(&mut self, request: &PendingRequest) -> Reply {
        let mut deltas = match self.begin(request) {
            Ok(deltas) => deltas,
            Err(reply) => return reply,
        };
        while let Some(delta) = self.cascade_step() {
            deltas.push(delta);
        }
        deltas.extend(self.finish());
        Reply::Accepted {
            request_id: request.request_id,
            deltas,
        }
    }

    pub fn ai_to_move(&self) -> bool {
        self.controller.ai_to_move()
    }

    pub fn ai_thinking_delay(&mut self) -> Duration {
        self.controller.ai_thinking_delay()
    }

    /// Choose the AI's rod and start resolving it
    pub fn begin_ai_turn(&mut self) -> Option<Vec<Sequenced>> {
        if !self.ai_to_move() {
            return None;
        }
        let player = self.controller.active_player();
        let (x, z) = self.controller.choose_ai_move()?;
        let placed = self.controller.begin_turn(player, x, z).ok()?;
        Some(self.record(vec![placed]))
    }

    pub fn play_ai_turn(&mut self) -> Vec<Sequenced> {
        let events = self.controller.play_ai_turn();
        self.record(events)
    }

    /// A peer went away. Losing a seated player ends the game as a tie;
    /// spectators leave silently.
    pub fn disconnect(&mut self, origin: &Origin) -> Vec<Sequenced> {
        if self.seat_of(origin).is_none() {
            return Vec::new();
        }
        let events = self.controller.end_by_disconnect();
        self.record(events)
    }

    pub fn catch_up(&self, since: u64) -> Catchup {
        self.log.catch_up(since)
    }

    pub fn latest_seq(&self) -> u64 {
        self.log.latest_seq()
    }

    /// Current state at the latest sequence number
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.controller, self.latest_seq())
    }

    fn record(&mut self, events: Vec<GameEvent>) -> Vec<Sequenced> {
        let mut seq = self.log.latest_seq();
        let mut new_round = false;
        let deltas: Vec<Sequenced> = events
            .into_iter()
            .map(|event| {
                seq += 1;
                if matches!(event, GameEvent::RoundStarted { round, .. } if round > 0) {
                    new_round = true;
                }
                Sequenced { seq, event }
            })
            .collect();

        for delta in &deltas {
            self.log.push(delta.clone());
        }
        if new_round {
            // The round-start snapshot supersedes everything buffered before it
            let base = self.snapshot();
            self.log.rebase(base);
            debug!(seq = self.latest_seq(), "delta log rebased");
        }
        deltas
    }
}
