//! Per-token session state: the append-only event log and the live endpoint set.

use std::{collections::HashMap, sync::Mutex};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::EventRecord;

/// Identity of one live endpoint connection within a session.
pub type EndpointId = Uuid;

/// Outbound half of an endpoint. Records queued here are delivered to the
/// endpoint by its transport task; sends never block.
pub type EndpointSender = mpsc::UnboundedSender<EventRecord>;

struct SessionState {
    log: Vec<EventRecord>,
    endpoints: HashMap<EndpointId, EndpointSender>,
}

/// One relay session: an ordered record log plus the endpoints currently
/// connected under the session's token.
///
/// All mutation goes through a single mutex, which makes replay-then-register
/// and append-then-fan-out atomic with respect to each other: an endpoint
/// joining during a publish can neither miss the record being appended nor
/// receive it twice. The only work done under the lock is unbounded channel
/// sends, which cannot block.
///
/// Every endpoint is a symmetric peer that may both emit and receive; there
/// is no broadcaster/watcher distinction here.
pub struct Session {
    token: String,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create an empty session for `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            state: Mutex::new(SessionState {
                log: Vec::new(),
                endpoints: HashMap::new(),
            }),
        }
    }

    /// The token this session is registered under.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Join a new endpoint: replay the full log into `outbound` in order, then
    /// register it for live fan-out.
    ///
    /// Replay and registration happen under one lock, so every existing record
    /// reaches the endpoint exactly once, as history, and everything appended
    /// afterwards reaches it exactly once, as live traffic.
    pub fn join(&self, outbound: EndpointSender) -> EndpointId {
        let id = EndpointId::new_v4();
        let mut state = self.state.lock().unwrap();
        for record in &state.log {
            // A receiver that is already gone gets pruned on the next publish.
            let _ = outbound.send(record.clone());
        }
        state.endpoints.insert(id, outbound);
        id
    }

    /// Append `record` to the log and fan it out to every endpoint except the
    /// producing one.
    ///
    /// An endpoint whose outbound channel is closed counts as disconnected and
    /// is pruned; delivery to the rest is unaffected. Returns how many
    /// endpoints the record was delivered to.
    pub fn publish(&self, from: EndpointId, record: &EventRecord) -> usize {
        let mut state = self.state.lock().unwrap();
        state.log.push(record.clone());

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (&id, outbound) in &state.endpoints {
            if id == from {
                continue;
            }
            if outbound.send(record.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }
        for id in dead {
            state.endpoints.remove(&id);
            tracing::debug!(token = %self.token, endpoint = %id, "pruned endpoint with closed channel");
        }
        delivered
    }

    /// Remove an endpoint from the session.
    ///
    /// The log and the remaining endpoints are untouched, and the session
    /// itself stays registered even when this was the last endpoint. Removing
    /// an endpoint that is already gone is a no-op.
    pub fn leave(&self, id: EndpointId) -> bool {
        self.state.lock().unwrap().endpoints.remove(&id).is_some()
    }

    /// Snapshot of the current log, in append order.
    #[must_use]
    pub fn history(&self) -> Vec<EventRecord> {
        self.state.lock().unwrap().log.clone()
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.state.lock().unwrap().log.len()
    }

    /// Number of currently connected endpoints.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.state.lock().unwrap().endpoints.len()
    }
}
