//! FIFO of placement requests waiting for the authority

use std::collections::VecDeque;

use super::protocol::{Origin, PendingRequest, RequestId};

/// A queued request with whatever the transport needs to answer it
#[derive(Debug)]
pub struct Queued<T> {
    pub request: PendingRequest,
    pub reply_to: T,
}

/// Requests are handled strictly in arrival order. A request can be
/// withdrawn only while it is still queued.
#[derive(Debug)]
pub struct Inbox<T> {
    queue: VecDeque<Queued<T>>,
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> Inbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: PendingRequest, reply_to: T) {
        self.queue.push_back(Queued { request, reply_to });
    }

    pub fn pop(&mut self) -> Option<Queued<T>> {
        self.queue.pop_front()
    }

    /// Remove a still-queued request; `None` means it was already taken
    pub fn cancel(&mut self, origin: &Origin, request_id: RequestId) -> Option<Queued<T>> {
        let idx = self
            .queue
            .iter()
            .position(|q| &q.request.origin == origin && q.request.request_id == request_id)?;
        self.queue.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
