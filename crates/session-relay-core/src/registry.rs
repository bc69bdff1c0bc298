//! Process-wide mapping from session token to live session.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::Session;

/// Registry of every session in this process.
///
/// Sessions are created lazily by the first connection that names an unknown
/// token and are retained for the life of the process, so a watcher that
/// drops off can rejoin later and still get full replay. There is no remove
/// operation: eviction, if ever wanted, is a policy to layer on top of this
/// interface rather than a side effect of disconnects.
///
/// One instance is owned by the process and shared with every connection
/// handler.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `token`, creating an empty one if none exists.
    ///
    /// Safe under concurrent calls: two first connections racing on the same
    /// unknown token both observe the same session.
    pub fn resolve_or_create(&self, token: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().unwrap().get(token) {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(sessions.entry(token.to_owned()).or_insert_with(|| {
            tracing::info!(%token, "created new session");
            Arc::new(Session::new(token))
        }))
    }

    /// Look up a session without creating one.
    ///
    /// Used by presentation layers that want to distinguish "no broadcaster
    /// ever connected" from an existing session.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions.read().unwrap().get(token).map(Arc::clone)
    }

    /// Number of sessions currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Whether no session has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a fresh session token: 16 random bytes, hex encoded.
///
/// The token is shared out-of-band and is the sole guard on a session, so it
/// carries 128 bits of randomness.
#[must_use]
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
