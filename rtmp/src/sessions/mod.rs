//! Session abstractions.
//!
//! A session reacts to decoded RTMP messages with an ordered list of
//! outputs: messages to send back to the peer and events for the
//! application to act on.  Sessions know nothing about chunks or sockets,
//! which keeps them independently testable; the [`crate::connection`]
//! module owns the wiring.

mod server;

pub use self::server::{
    OutboundMessage, ServerSession, ServerSessionConfig, ServerSessionError, ServerSessionEvent,
    ServerSessionOutput,
};
