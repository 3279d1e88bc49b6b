//! Authority/mirror synchronization
//!
//! - `protocol`: message shapes exchanged over the transport
//! - `log`: buffered, sequenced deltas with snapshot fallback
//! - `inbox`: FIFO of pending requests, cancellable until dequeued
//! - `authority`: validates, applies and sequences placements
//! - `mirror`: a peer's read-only copy, fed by deltas

pub mod authority;
pub mod inbox;
pub mod log;
pub mod mirror;
pub mod protocol;

pub use authority::{Authority, JoinAck};
pub use inbox::{Inbox, Queued};
pub use log::DeltaLog;
pub use mirror::Mirror;
pub use protocol::{
    decode_client_message, Catchup, ClientMessage, Origin, PeerId, PendingRequest, Piece,
    RejectReason, Reply, RequestId, Sequenced, Snapshot,
};
