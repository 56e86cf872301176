use crate::time::RtmpTimestamp;

/// The four chunk header formats, named for what they carry rather than
/// their wire numbers (0 through 3).
#[derive(PartialEq, Debug)]
pub enum ChunkHeaderFormat {
    /// Format 0: timestamp, length, type id, and message stream id
    Full,

    /// Format 1: timestamp delta, length, and type id
    TimeDeltaWithoutMessageStreamId,

    /// Format 2: timestamp delta only
    TimeDeltaOnly,

    /// Format 3: nothing, everything inherited from the previous chunk
    Empty,
}

/// The accumulated header state for one chunk stream.
///
/// `timestamp_field` holds the raw value the chunk's timestamp field
/// conveys: the absolute timestamp for a full header, the delta for the
/// delta formats, and the inherited value for an empty header.  A type 3
/// chunk re-applies this value, which is why it has to be carried alongside
/// the resolved `timestamp`.
#[derive(Debug)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub can_be_dropped: bool,
}

impl ChunkHeader {
    pub fn new() -> ChunkHeader {
        ChunkHeader {
            chunk_stream_id: 0,
            timestamp: RtmpTimestamp::new(0),
            timestamp_field: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
            can_be_dropped: false,
        }
    }
}
