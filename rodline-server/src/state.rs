//! Server state management
//!
//! One authoritative session per server. Placement requests queue in the
//! inbox and a single driver works through them, pausing between cascade
//! passes and before AI moves. The driver gate is the only serialization
//! point; the std mutexes are held for single calls only, never across an
//! await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rodline_core::sync::{Authority, Inbox, PendingRequest, Reply, Sequenced};
use rodline_core::{ConfigError, GameEvent, MatchConfig, Timing};
use tokio::sync::{oneshot, Notify};

/// Server-wide shared state
pub struct ServerState {
    authority: Mutex<Authority>,
    inbox: Mutex<Inbox<oneshot::Sender<Reply>>>,
    gate: tokio::sync::Mutex<()>,
    /// Woken whenever new deltas are recorded
    pub updates: Notify,
    pub timing: Timing,
}

impl ServerState {
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        let timing = config.timing;
        Ok(Self {
            authority: Mutex::new(Authority::new(config)?),
            inbox: Mutex::new(Inbox::new()),
            gate: tokio::sync::Mutex::new(()),
            updates: Notify::new(),
            timing,
        })
    }

    pub fn authority(&self) -> MutexGuard<'_, Authority> {
        self.authority.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inbox(&self) -> MutexGuard<'_, Inbox<oneshot::Sender<Reply>>> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a placement; the receiver resolves once the driver answers it
    pub fn enqueue(&self, request: PendingRequest) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.inbox().push(request, tx);
        rx
    }

    /// Run the driver in the background
    pub fn kick(state: &Arc<ServerState>) {
        let state = Arc::clone(state);
        tokio::spawn(async move { state.drive().await });
    }

    /// Work through queued requests, then any AI turns, one at a time
    pub async fn drive(&self) {
        let _gate = self.gate.lock().await;
        loop {
            let next = self.inbox().pop();
            if let Some(queued) = next {
                let reply = self.resolve_request(&queued.request).await;
                if queued.reply_to.send(reply).is_err() {
                    tracing::debug!(origin = ?queued.request.origin, "requester went away");
                }
                continue;
            }

            let ai_to_move = self.authority().ai_to_move();
            if ai_to_move {
                self.play_ai_turn().await;
                continue;
            }
            break;
        }
    }

    async fn resolve_request(&self, request: &PendingRequest) -> Reply {
        let begun = self.authority().begin(request);
        let mut deltas = match begun {
            Ok(deltas) => deltas,
            Err(reply) => {
                tracing::debug!(origin = ?request.origin, ?reply, "request rejected");
                return reply;
            }
        };
        self.updates.notify_waiters();
        deltas.extend(self.settle_turn().await);
        Reply::Accepted {
            request_id: request.request_id,
            deltas,
        }
    }

    async fn play_ai_turn(&self) {
        let delay = self.authority().ai_thinking_delay();
        pause(delay).await;

        let begun = self.authority().begin_ai_turn();
        if begun.is_some() {
            self.updates.notify_waiters();
            self.settle_turn().await;
        } else {
            // No legal rod: let the controller close the round
            let deltas = self.authority().play_ai_turn();
            tracing::warn!(recorded = deltas.len(), "ai had no move");
            self.updates.notify_waiters();
        }
    }

    /// Cascade passes with the settle delay between them, then the turn switch
    async fn settle_turn(&self) -> Vec<Sequenced> {
        let mut deltas = Vec::new();
        loop {
            pause(self.timing.settle_delay()).await;
            let step = self.authority().cascade_step();
            match step {
                Some(delta) => {
                    deltas.push(delta);
                    self.updates.notify_waiters();
                }
                None => break,
            }
        }

        let finished = self.authority().finish();
        let round_over = finished
            .iter()
            .any(|d| matches!(d.event, GameEvent::RoundEnded { .. }));
        deltas.extend(finished);
        self.updates.notify_waiters();

        if round_over {
            pause(self.timing.round_end_delay()).await;
        }
        deltas
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
