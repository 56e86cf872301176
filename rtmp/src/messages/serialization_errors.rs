use riptide_amf::AmfSerializationError;
use std::io;
use thiserror::Error;

/// An enumeration representing the errors that may occur while trying to
/// turn an RTMP message into a message payload.
#[derive(Debug, Error)]
pub enum MessageSerializationError {
    /// The SetChunkSize message requires its high bit to be zero, so sizes
    /// above 2,147,483,647 cannot be represented.
    #[error("Chunk sizes cannot exceed the 31 bits the wire format allows")]
    InvalidChunkSize,

    /// The message's values could not be encoded as AMF
    #[error("The message could not be encoded into valid AMF values: {0}")]
    AmfSerializationError(#[from] AmfSerializationError),

    /// Failed to write the values to the output buffer
    #[error("An IO error occurred while writing the output: {0}")]
    Io(#[from] io::Error),
}
