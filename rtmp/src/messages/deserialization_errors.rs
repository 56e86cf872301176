use riptide_amf::AmfDeserializationError;
use std::io;
use thiserror::Error;

/// An enumeration representing the errors that may occur while trying to
/// turn a message payload into an RTMP message.
#[derive(Debug, Error)]
pub enum MessageDeserializationError {
    /// The bytes or AMF values contained in the message were not what the
    /// message type calls for, so the message could not be parsed.
    #[error("The message was not encoded in an expected format")]
    InvalidMessageFormat,

    /// The bytes that were expected to be AMF encoded values could not be
    /// read as such.
    #[error("The message did not contain valid AMF encoded values: {0}")]
    AmfDeserializationError(#[from] AmfDeserializationError),

    /// Failed to read the values from the input buffer
    #[error("An IO error occurred while reading the input: {0}")]
    Io(#[from] io::Error),
}
