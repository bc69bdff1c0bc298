//! In-memory session relay core.
//!
//! This crate provides the fundamental building blocks:
//! - `EventRecord` - one opaque, ordered payload unit
//! - `Session` - per-token event log + endpoint set, with replay for late
//!   joiners and live fan-out between connected endpoints
//! - `SessionRegistry` - lazy token -> session map shared by all connections

pub mod record;
pub mod registry;
pub mod session;

pub use record::{EventRecord, MalformedPayload};
pub use registry::{SessionRegistry, generate_token};
pub use session::{EndpointId, EndpointSender, Session};
