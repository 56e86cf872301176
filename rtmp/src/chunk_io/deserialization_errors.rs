use std::io;
use thiserror::Error;

/// An enumeration defining all the possible errors that could occur while
/// deserializing RTMP chunks.  Every one of these is a protocol violation
/// that the session cannot recover from, since chunk header compression
/// makes the rest of the stream undecodable once state diverges.
#[derive(Debug, Error)]
pub enum ChunkDeserializationError {
    /// Chunks that are not format 0 inherit fields from the previous chunk
    /// on the same chunk stream id, so one must have been seen first.
    #[error("Received a chunk with a non-zero format on csid {csid} prior to receiving a format 0 chunk")]
    NoPreviousChunkOnStream { csid: u32 },

    /// A message split across chunks must finish before another header with
    /// message fields shows up on the same chunk stream; continuation chunks
    /// are required to use format 3.
    #[error("Received a format {format} chunk on csid {csid} while a message is still being reassembled")]
    MessageInterruptedMidReassembly { csid: u32, format: u8 },

    /// The declared message length exceeded the configured cap.  The wire
    /// format tops out at 16,777,215 bytes, but a session may choose a lower
    /// limit to bound its reassembly buffers.
    #[error("Declared message length of {length} bytes is over the allowed maximum of {maximum} bytes")]
    MessageTooLong { length: u32, maximum: u32 },

    /// Chunk sizes are bounded by what the 24 bit message length can ever
    /// need; zero is also rejected since a zero byte chunk can make no
    /// progress.
    #[error("Requested an invalid max chunk size of {chunk_size}. Chunk sizes must be between 1 and 16777215")]
    InvalidMaxChunkSize { chunk_size: usize },

    /// A message size cap can only tighten the protocol limit, not raise it.
    #[error("Requested an invalid max message size of {size}. The protocol limit is 16777215")]
    InvalidMaxMessageSize { size: u32 },

    /// An I/O error occurred while reading the input buffer
    #[error("{0}")]
    Io(#[from] io::Error),
}
