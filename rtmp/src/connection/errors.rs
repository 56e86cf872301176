use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::handshake::HandshakeError;
use crate::messages::MessageSerializationError;
use crate::sessions::ServerSessionError;
use thiserror::Error;

/// An enumeration representing the errors a connection can encounter.
///
/// Apart from [`ConnectionError::SessionError`] (which reports a bad
/// application call and leaves the connection running), any error returned
/// by `feed_inbound` is fatal: the connection transitions to closed and
/// every later call fails with [`ConnectionError::SessionClosed`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection was closed by an earlier fatal error or transport
    /// shutdown; no further work can be done with it.
    #[error("The connection is closed")]
    SessionClosed,

    /// The peer failed the RTMP handshake
    #[error("Handshake failed: {0}")]
    HandshakeFailed(#[from] HandshakeError),

    /// The peer violated the chunking protocol
    #[error("Failed to deserialize the inbound chunk stream: {0}")]
    ChunkDeserializationError(#[from] ChunkDeserializationError),

    /// An outbound message could not be split into chunks
    #[error("Failed to serialize an outbound message into chunks: {0}")]
    ChunkSerializationError(#[from] ChunkSerializationError),

    /// An outbound message could not be encoded into a payload
    #[error("Failed to encode an outbound message: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),

    /// The session refused an operation, e.g. a decision on an unknown
    /// request id
    #[error("Session error: {0}")]
    SessionError(#[from] ServerSessionError),
}
