//! WebSocket transport for the session relay.
//!
//! One bidirectional channel per connection: frames in are parsed into event
//! records and published to the session, records out are queued per endpoint
//! and forwarded by a dedicated task.

pub mod websocket;

pub use websocket::{WsState, router, ws_handler};
