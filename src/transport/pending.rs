//! In-flight request bookkeeping.
//!
//! Every entry owns the caller's reply channel. Removing an entry is the
//! only way to settle it, so no request can settle twice and a settled
//! request never stays in the map.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{Error, TransportError};
use crate::transport::RpcRequest;

/// Where the outcome of a request is delivered.
pub(crate) type Reply = oneshot::Sender<Result<Value, Error>>;

#[derive(Debug)]
struct PendingRequest {
    request: RpcRequest,
    reply: Reply,
    deadline: Option<(Instant, Duration)>,
    /// Written to the current socket.
    sent: bool,
}

/// Requests awaiting a response, keyed (and flushed) by ascending id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    entries: BTreeMap<u64, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Track a new request. A duplicate id is rejected immediately and the
    /// existing entry is left alone.
    pub(crate) fn insert(&mut self, request: RpcRequest, reply: Reply, timeout: Option<Duration>) {
        let id = request.id;
        if self.entries.contains_key(&id) {
            let _ = reply.send(Err(TransportError::Message(format!(
                "request id {id} is already pending"
            ))
            .into()));
            return;
        }
        let deadline = timeout.map(|after| (Instant::now() + after, after));
        self.entries.insert(
            id,
            PendingRequest {
                request,
                reply,
                deadline,
                sent: false,
            },
        );
    }

    pub(crate) fn request(&self, id: u64) -> Option<&RpcRequest> {
        self.entries.get(&id).map(|entry| &entry.request)
    }

    /// Settle and remove `id`. Returns false when it was not pending.
    pub(crate) fn resolve(&mut self, id: u64, outcome: Result<Value, Error>) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                // The caller may have stopped waiting; nothing to do then.
                let _ = entry.reply.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Reject every request whose deadline is at or before `now`.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<u64> {
        let expired: Vec<(u64, Duration)> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| match entry.deadline {
                Some((deadline, after)) if deadline <= now => Some((*id, after)),
                _ => None,
            })
            .collect();

        for (id, after) in &expired {
            self.resolve(*id, Err(TransportError::Timeout { id: *id, after: *after }.into()));
        }
        expired.into_iter().map(|(id, _)| id).collect()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter_map(|entry| entry.deadline.map(|(deadline, _)| deadline))
            .min()
    }

    /// Ids not yet written to the current socket, ascending.
    pub(crate) fn unsent(&self) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.sent)
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn mark_sent(&mut self, id: u64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.sent = true;
        }
    }

    /// After a lost connection every request must be written again.
    pub(crate) fn mark_all_unsent(&mut self) {
        for entry in self.entries.values_mut() {
            entry.sent = false;
        }
    }

    pub(crate) fn reject_all(&mut self, error: TransportError) {
        for (_, entry) in std::mem::take(&mut self.entries) {
            let _ = entry.reply.send(Err(error.clone().into()));
        }
    }
}

impl Drop for PendingRequests {
    fn drop(&mut self) {
        self.reject_all(TransportError::Closed);
    }
}
