//! Session API endpoints
//!
//! Peers join for a seat, send placement requests and long-poll the delta
//! stream. Every message is also accepted in its tagged form on
//! `/api/session/message`.

use crate::state::ServerState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rodline_core::sync::{
    decode_client_message, ClientMessage, Origin, PeerId, PendingRequest, RejectReason, Reply,
    RequestId,
};
use rodline_core::{Player, SyncError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Body naming the calling peer
#[derive(Deserialize)]
pub struct PeerRequest {
    pub peer: PeerId,
}

/// Placement request body
#[derive(Deserialize)]
pub struct PlaceRequest {
    pub peer: PeerId,
    pub request_id: RequestId,
    pub x: u8,
    pub z: u8,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub peer: PeerId,
    pub request_id: RequestId,
}

/// Poll query params
#[derive(Deserialize)]
pub struct PollParams {
    pub since: Option<u64>,
    pub wait_ms: Option<u64>,
}

const POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_ROUNDS: u64 = 50;

/// Take a seat (or spectate) and receive the current snapshot
pub async fn join_session(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<PeerRequest>,
) -> Json<Value> {
    Json(join(&state, req.peer))
}

/// Queue a placement and wait for the authority's answer
pub async fn place_piece(State(state): State<Arc<ServerState>>, body: String) -> (StatusCode, Json<Reply>) {
    match serde_json::from_str::<PlaceRequest>(&body) {
        Ok(req) => place(&state, req.peer, req.request_id, req.x, req.z).await,
        Err(e) => malformed(&SyncError::Malformed(e.to_string())),
    }
}

/// Withdraw a request that is still queued
pub async fn cancel_request(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<CancelRequest>,
) -> Json<Value> {
    Json(cancel(&state, req.peer, req.request_id))
}

/// Leave the session; a seated peer leaving ends the game
pub async fn leave_session(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<PeerRequest>,
) -> Json<Value> {
    Json(leave(&state, req.peer))
}

/// Current authoritative snapshot
pub async fn get_snapshot(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let snapshot = state.authority().snapshot();
    Json(json!({ "snapshot": snapshot }))
}

/// Long-poll for deltas after `since`
pub async fn poll_session(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PollParams>,
) -> Json<Value> {
    let since = params.since.unwrap_or(0);
    let rounds = params
        .wait_ms
        .map_or(MAX_POLL_ROUNDS, |ms| ms.div_ceil(POLL_INTERVAL_MS))
        .min(MAX_POLL_ROUNDS);

    for _ in 0..rounds {
        let catchup = state.authority().catch_up(since);
        if !catchup.is_empty() {
            let latest_seq = state.authority().latest_seq();
            return Json(json!({ "latest_seq": latest_seq, "catchup": catchup }));
        }
        // A missed wakeup costs one interval at most
        let _ = tokio::time::timeout(
            Duration::from_millis(POLL_INTERVAL_MS),
            state.updates.notified(),
        )
        .await;
    }

    let authority = state.authority();
    Json(json!({
        "latest_seq": authority.latest_seq(),
        "catchup": authority.catch_up(since),
    }))
}

/// Any client message in its tagged wire form
pub async fn handle_message(State(state): State<Arc<ServerState>>, body: String) -> (StatusCode, Json<Value>) {
    let message = match decode_client_message(&body) {
        Ok(message) => message,
        Err(e) => {
            let (status, Json(reply)) = malformed(&e);
            return (status, Json(json!(reply)));
        }
    };

    match message {
        ClientMessage::Join { peer } => (StatusCode::OK, Json(join(&state, peer))),
        ClientMessage::Place {
            peer,
            request_id,
            x,
            z,
        } => {
            let (status, Json(reply)) = place(&state, peer, request_id, x, z).await;
            (status, Json(json!(reply)))
        }
        ClientMessage::Cancel { peer, request_id } => {
            (StatusCode::OK, Json(cancel(&state, peer, request_id)))
        }
        ClientMessage::Leave { peer } => (StatusCode::OK, Json(leave(&state, peer))),
    }
}

fn join(state: &Arc<ServerState>, peer: PeerId) -> Value {
    let ack = state.authority().join(Origin::Remote(peer));
    ServerState::kick(state);
    json!({
        "seat": ack.seat.map(Player::number),
        "seq": ack.snapshot.seq,
        "snapshot": ack.snapshot,
    })
}

async fn place(
    state: &Arc<ServerState>,
    peer: PeerId,
    request_id: RequestId,
    x: u8,
    z: u8,
) -> (StatusCode, Json<Reply>) {
    let rx = state.enqueue(PendingRequest {
        origin: Origin::Remote(peer),
        request_id,
        x,
        z,
    });
    ServerState::kick(state);

    match rx.await {
        Ok(reply) => (StatusCode::OK, Json(reply)),
        Err(_) => {
            tracing::error!(request_id, "request dropped without a reply");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Reply::rejected(request_id, RejectReason::PeerDisconnected)),
            )
        }
    }
}

fn cancel(state: &ServerState, peer: PeerId, request_id: RequestId) -> Value {
    let removed = state.inbox().cancel(&Origin::Remote(peer), request_id);
    let cancelled = match removed {
        Some(queued) => {
            let _ = queued.reply_to.send(Reply::Cancelled { request_id });
            true
        }
        None => false,
    };
    json!({ "cancelled": cancelled, "request_id": request_id })
}

fn leave(state: &ServerState, peer: PeerId) -> Value {
    let deltas = state.authority().disconnect(&Origin::Remote(peer));
    if !deltas.is_empty() {
        state.updates.notify_waiters();
    }
    json!({ "deltas": deltas })
}

fn malformed(error: &SyncError) -> (StatusCode, Json<Reply>) {
    (
        StatusCode::BAD_REQUEST,
        Json(Reply::rejected(
            0,
            RejectReason::Malformed {
                message: error.to_string(),
            },
        )),
    )
}
