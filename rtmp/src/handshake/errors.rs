use std::io;
use thiserror::Error;

/// An enumeration defining every error that can occur while performing the
/// RTMP handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer's first byte must be the RTMP version number 3.  Anything
    /// else is either a different protocol or a digest handshake variant we
    /// do not speak.
    #[error("First byte of the handshake was not the expected version of 3")]
    BadVersionId,

    /// Bytes arrived after the handshake finished.  Post-handshake bytes
    /// belong to the chunk stream and must not be routed here.
    #[error("Bytes were passed in after the handshake already completed")]
    HandshakeAlreadyCompleted,

    #[error("{0}")]
    Io(#[from] io::Error),
}
