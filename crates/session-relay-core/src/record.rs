//! Opaque event records relayed through a session.

use std::sync::Arc;

use serde::de::IgnoredAny;
use thiserror::Error;

/// Inbound payload that is not a well-formed serialized record.
#[derive(Debug, Error)]
#[error("malformed event record: {0}")]
pub struct MalformedPayload(#[from] serde_json::Error);

/// One opaque, ordered, immutable payload unit.
///
/// The relay never looks inside a record: the serialized form reaches every
/// receiver byte-for-byte as it arrived. Clones share the underlying buffer,
/// so fanning a record out to many endpoints is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    raw: Arc<str>,
}

impl EventRecord {
    /// Parse an inbound payload as an event record.
    ///
    /// Checks only that the payload is one complete serialized JSON value;
    /// the structure inside is the producer's business.
    ///
    /// # Errors
    /// Returns [`MalformedPayload`] if the payload is not well-formed.
    pub fn parse(raw: &str) -> Result<Self, MalformedPayload> {
        let _: IgnoredAny = serde_json::from_str(raw)?;
        Ok(Self {
            raw: Arc::from(raw),
        })
    }

    /// The serialized form, exactly as it arrived.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
