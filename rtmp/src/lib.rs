//! Protocol machinery for running the server side of an RTMP connection.
//!
//! The crate is organized as independent state machines that a transport
//! driver composes:
//!
//! * [`handshake`] performs the simple (non-digest) RTMP handshake.
//! * [`chunk_io`] turns the RTMP chunk stream into whole messages and back.
//! * [`messages`] encodes and decodes each RTMP message type.
//! * [`sessions`] reacts to decoded messages with responses to send and
//!   events for the application to act on.
//! * [`connection`] wires the above together behind a byte-in/byte-out
//!   surface for transports that just want to pump a socket.
//!
//! None of the modules open sockets or spawn tasks.  Each connection's state
//! is owned by exactly one driver, so there is no shared mutable state and
//! no locking anywhere in the crate.

pub mod chunk_io;
pub mod connection;
pub mod handshake;
pub mod messages;
pub mod sessions;
pub mod time;
