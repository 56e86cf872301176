//! Turns the RTMP chunk stream into whole message payloads and back.
//!
//! Chunks on different chunk stream ids may interleave, headers compress
//! against the previous chunk on the same chunk stream, and messages larger
//! than the negotiated chunk size split across continuation chunks.  The
//! [`ChunkDeserializer`] and [`ChunkSerializer`] each own one direction's
//! state; both sides of one connection must keep using the same instances.

mod chunk_header;
mod deserialization_errors;
mod deserializer;
mod serialization_errors;
mod serializer;

pub use self::deserialization_errors::ChunkDeserializationError;
pub use self::deserializer::ChunkDeserializer;
pub use self::serialization_errors::ChunkSerializationError;
pub use self::serializer::{ChunkSerializer, Packet};
