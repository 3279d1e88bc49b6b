//! Wire shapes exchanged between the authority and its peers

use serde::{Deserialize, Serialize};

use crate::board::{ActiveRegion, Board, Player, Pos};
use crate::error::{PlacementError, SyncError};
use crate::events::GameEvent;
use crate::score::{Outcome, Scoreboard};
use crate::turn::{TurnController, TurnState};

pub type PeerId = String;

/// Per-peer request counter, echoed back in the reply
pub type RequestId = u64;

/// Where a placement request came from
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Input on the authority's own process
    Local,
    Remote(PeerId),
}

/// A placement intent, alive only until the authority handles it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub origin: Origin,
    pub request_id: RequestId,
    pub x: u8,
    pub z: u8,
}

/// Peer → authority
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { peer: PeerId },
    Place { peer: PeerId, request_id: RequestId, x: u8, z: u8 },
    Cancel { peer: PeerId, request_id: RequestId },
    Leave { peer: PeerId },
}

impl ClientMessage {
    pub fn peer(&self) -> &str {
        match self {
            ClientMessage::Join { peer }
            | ClientMessage::Place { peer, .. }
            | ClientMessage::Cancel { peer, .. }
            | ClientMessage::Leave { peer } => peer,
        }
    }
}

/// Parse a peer message; anything unreadable becomes [`SyncError::Malformed`]
pub fn decode_client_message(raw: &str) -> Result<ClientMessage, SyncError> {
    serde_json::from_str(raw).map_err(|e| SyncError::Malformed(e.to_string()))
}

/// An event with its position in the authority's delta stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequenced {
    pub seq: u64,
    pub event: GameEvent,
}

/// Why the authority refused a request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    RodFull { x: u8, z: u8 },
    OutOfActiveRegion { x: u8, z: u8 },
    NotYourTurn { requested: Player, active: Player },
    RequestWhileLocked,
    PeerDisconnected,
    GameFinished,
    /// The sender holds no seat (spectator or unknown peer)
    NotSeated,
    Malformed { message: String },
}

impl From<PlacementError> for RejectReason {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::RodFull { x, z } => RejectReason::RodFull { x, z },
            PlacementError::OutOfActiveRegion { x, z } => RejectReason::OutOfActiveRegion { x, z },
            PlacementError::NotYourTurn { requested, active } => {
                RejectReason::NotYourTurn { requested, active }
            }
            PlacementError::RequestWhileLocked => RejectReason::RequestWhileLocked,
            PlacementError::PeerDisconnected => RejectReason::PeerDisconnected,
            PlacementError::GameFinished => RejectReason::GameFinished,
        }
    }
}

/// Authority → requester, point to point
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Accepted { request_id: RequestId, deltas: Vec<Sequenced> },
    Rejected { request_id: RequestId, reason: RejectReason },
    /// Withdrawn before the authority applied it
    Cancelled { request_id: RequestId },
}

impl Reply {
    pub fn request_id(&self) -> RequestId {
        match self {
            Reply::Accepted { request_id, .. }
            | Reply::Rejected { request_id, .. }
            | Reply::Cancelled { request_id } => *request_id,
        }
    }

    pub fn rejected(request_id: RequestId, reason: impl Into<RejectReason>) -> Self {
        Reply::Rejected {
            request_id,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub pos: Pos,
    pub player: Player,
}

/// Full authoritative state at one point of the delta stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub seq: u64,
    pub size: u8,
    pub height: u8,
    pub round: u32,
    pub region: ActiveRegion,
    pub required_length: u8,
    pub pieces: Vec<Piece>,
    pub scores: Scoreboard,
    pub turn: TurnState,
    pub used_cells: u32,
    pub capacity: u32,
    pub outcome: Option<Outcome>,
}

impl Snapshot {
    pub fn capture(controller: &TurnController, seq: u64) -> Self {
        let board = controller.board();
        Self {
            seq,
            size: board.size(),
            height: board.height(),
            round: controller.round(),
            region: controller.region(),
            required_length: controller.required_length(),
            pieces: board
                .occupied()
                .map(|(pos, player)| Piece { pos, player })
                .collect(),
            scores: *controller.scores(),
            turn: controller.turn_state(),
            used_cells: controller.used_cells(),
            capacity: controller.capacity(),
            outcome: controller.outcome().copied(),
        }
    }

    /// Rebuild the board this snapshot describes. A region or piece
    /// outside the board is refused rather than applied.
    pub fn to_board(&self) -> Result<Board, SyncError> {
        if self.size == 0 || self.height == 0 {
            return Err(SyncError::Malformed(format!(
                "snapshot board is {}x{}x{}",
                self.size, self.size, self.height
            )));
        }
        if !self.region.fits(self.size, self.height) {
            return Err(SyncError::Malformed(format!(
                "snapshot region {:?} exceeds the board",
                self.region
            )));
        }
        let mut board = Board::new(self.size, self.height);
        board.set_region(self.region);
        for piece in &self.pieces {
            if !board.in_bounds(piece.pos) {
                return Err(SyncError::Malformed(format!(
                    "snapshot piece at {:?} is off the board",
                    piece.pos
                )));
            }
            board.set(piece.pos, Some(piece.player));
        }
        Ok(board)
    }
}

/// What a (re)connecting or polling peer needs to get current
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Catchup {
    /// Deltas after the peer's last sequence number
    Deltas { deltas: Vec<Sequenced> },
    /// The peer is behind the retained window: start over from a snapshot
    Snapshot { snapshot: Snapshot, deltas: Vec<Sequenced> },
}

impl Catchup {
    pub fn deltas(&self) -> &[Sequenced] {
        match self {
            Catchup::Deltas { deltas } | Catchup::Snapshot { deltas, .. } => deltas,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Catchup::Deltas { deltas } if deltas.is_empty())
    }
}
