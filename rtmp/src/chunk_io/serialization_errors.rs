use crate::messages::MessageSerializationError;
use std::io;
use thiserror::Error;

/// An enumeration defining all the possible errors that could occur while
/// serializing RTMP messages into RTMP chunks.
#[derive(Debug, Error)]
pub enum ChunkSerializationError {
    /// The message length field is 24 bits, so a message can never be more
    /// than 16,777,215 bytes even when split across multiple chunks.
    #[error("The current message has a length of {size} bytes, which is over the allowed size of 16777215 bytes")]
    MessageTooLong { size: usize },

    /// Chunk sizes are bounded by what the 24 bit message length can ever
    /// need; zero is also rejected since a zero byte chunk can make no
    /// progress.
    #[error("Requested an invalid max chunk size of {chunk_size}. Chunk sizes must be between 1 and 16777215")]
    InvalidMaxChunkSize { chunk_size: u32 },

    /// The basic header can address chunk stream ids 2 through 65599; ids 0
    /// and 1 are the escape codes that select the wider encodings.
    #[error("Chunk stream id {csid} is outside the encodable range of 2 through 65599")]
    InvalidChunkStreamId { csid: u32 },

    /// Occurs when the serializer fails to create its own SetChunkSize
    /// message while changing the outbound chunk size.
    #[error("Failed to create a SetChunkSize message: {0}")]
    SetChunkSizeMessageCreationFailure(#[from] MessageSerializationError),

    /// An I/O error occurred while writing the output buffer
    #[error("{0}")]
    Io(#[from] io::Error),
}
