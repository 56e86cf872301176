use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use crate::chunk_io::ChunkDeserializationError;
use crate::messages::MessagePayload;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::BytesMut;
use std::cmp::min;
use std::collections::HashMap;
use std::io::Cursor;
use std::mem;

const INITIAL_MAX_CHUNK_SIZE: usize = 128;
const MAX_CHUNK_SIZE: usize = 16777215;
const MAX_MESSAGE_LENGTH: u32 = 16777215;
const EXTENDED_TIMESTAMP_SENTINEL: u32 = 16777215;

/// Allows deserializing bytes representing RTMP chunks into RTMP message
/// payloads.
///
/// Due to the nature of the RTMP chunk protocol every byte coming over the
/// wire must be fed to the same `ChunkDeserializer` instance, as chunk
/// headers rely on fields from previous chunks on the same chunk stream.
///
/// Messages split across several chunks are reassembled per chunk stream id,
/// so partial messages on different chunk streams may interleave freely; a
/// message on one chunk stream only has to finish before the *next* message
/// on that same chunk stream starts.
pub struct ChunkDeserializer {
    max_chunk_size: usize,
    max_message_length: u32,
    buffer: BytesMut,
    current_stage: ParseStage,
    current_format: ChunkHeaderFormat,
    current_header: ChunkHeader,
    previous_headers: HashMap<u32, ChunkHeader>,
    reassembly_buffers: HashMap<u32, BytesMut>,
}

enum ParseStage {
    BasicHeader,
    MessageTimestamp,
    MessageLength,
    MessageTypeId,
    MessageStreamId,
    ExtendedTimestamp,
    MessagePayload,
}

#[derive(Eq, PartialEq, Debug)]
enum ParseStageResult {
    Success,
    NotEnoughBytes,
}

impl ChunkDeserializer {
    /// Creates a new `ChunkDeserializer` expecting chunks at the initial
    /// chunk size of 128 bytes required by the RTMP specification.
    pub fn new() -> ChunkDeserializer {
        ChunkDeserializer {
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
            max_message_length: MAX_MESSAGE_LENGTH,
            buffer: BytesMut::with_capacity(4096),
            current_stage: ParseStage::BasicHeader,
            current_format: ChunkHeaderFormat::Full,
            current_header: ChunkHeader::new(),
            previous_headers: HashMap::new(),
            reassembly_buffers: HashMap::new(),
        }
    }

    /// Attempts to read the next complete RTMP message from the passed in
    /// bytes, plus whatever was buffered from previous calls.
    ///
    /// Incoming bytes are buffered internally, so the same bytes must not be
    /// passed in twice.  When a call returns `Ok(None)` the deserializer is
    /// waiting for more input.  When multiple messages are buffered only the
    /// first is returned; callers should loop with an empty slice until
    /// `None` comes back.
    ///
    /// Draining one message at a time matters: if the peer sends a
    /// `SetChunkSize` message, `set_max_chunk_size` must be called before
    /// the next `get_next_message` call or subsequent chunks will be split
    /// at the wrong boundaries.
    pub fn get_next_message(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<MessagePayload>, ChunkDeserializationError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            let mut complete_message = None;
            let result = match self.current_stage {
                ParseStage::BasicHeader => self.parse_basic_header()?,
                ParseStage::MessageTimestamp => self.parse_timestamp()?,
                ParseStage::MessageLength => self.parse_message_length()?,
                ParseStage::MessageTypeId => self.parse_message_type_id()?,
                ParseStage::MessageStreamId => self.parse_message_stream_id()?,
                ParseStage::ExtendedTimestamp => self.parse_extended_timestamp()?,
                ParseStage::MessagePayload => self.parse_payload(&mut complete_message)?,
            };

            if result == ParseStageResult::NotEnoughBytes || complete_message.is_some() {
                return Ok(complete_message);
            }
        }
    }

    /// Tells the deserializer the peer will start sending chunks with a
    /// different maximum size.  This should be called in reaction to a
    /// `SetChunkSize` message, and takes effect from the next chunk header
    /// parsed; a partially reassembled message keeps its in-flight chunk at
    /// the old size because that chunk was already consumed.
    pub fn set_max_chunk_size(&mut self, new_size: usize) -> Result<(), ChunkDeserializationError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkDeserializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        self.max_chunk_size = new_size;
        Ok(())
    }

    /// Returns the maximum size of any RTMP chunk the deserializer will
    /// currently accept.
    pub fn get_max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Caps the message length this session will reassemble.  The protocol
    /// ceiling (and the default) is 16,777,215 bytes; sessions carrying only
    /// control traffic may want something far smaller to bound their
    /// buffers.
    pub fn set_max_message_size(&mut self, size: u32) -> Result<(), ChunkDeserializationError> {
        if size == 0 || size > MAX_MESSAGE_LENGTH {
            return Err(ChunkDeserializationError::InvalidMaxMessageSize { size });
        }

        self.max_message_length = size;
        Ok(())
    }

    fn reassembly_in_progress(&self, csid: u32) -> bool {
        self.reassembly_buffers
            .get(&csid)
            .map_or(false, |buffer| !buffer.is_empty())
    }

    fn parse_basic_header(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        const CSID_MASK: u8 = 0b00111111;

        if self.buffer.is_empty() {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let format_id = self.buffer[0] >> 6;
        let (csid, header_length) = match self.buffer[0] & CSID_MASK {
            0 => {
                if self.buffer.len() < 2 {
                    return Ok(ParseStageResult::NotEnoughBytes);
                }

                (self.buffer[1] as u32 + 64, 2)
            }

            1 => {
                if self.buffer.len() < 3 {
                    return Ok(ParseStageResult::NotEnoughBytes);
                }

                (self.buffer[1] as u32 + (self.buffer[2] as u32 * 256) + 64, 3)
            }

            x => (x as u32, 1),
        };

        self.current_format = match format_id {
            0 => ChunkHeaderFormat::Full,
            1 => ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId,
            2 => ChunkHeaderFormat::TimeDeltaOnly,
            _ => ChunkHeaderFormat::Empty,
        };

        // Continuation chunks of a split message must be format 3; any
        // header that re-states message fields mid-reassembly would change
        // the length or type of a message in flight
        if self.current_format != ChunkHeaderFormat::Empty && self.reassembly_in_progress(csid) {
            return Err(ChunkDeserializationError::MessageInterruptedMidReassembly {
                csid,
                format: format_id,
            });
        }

        self.current_header = match self.current_format {
            ChunkHeaderFormat::Full => {
                let mut new_header = ChunkHeader::new();
                new_header.chunk_stream_id = csid;
                new_header
            }

            _ => match self.previous_headers.remove(&csid) {
                None => return Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid }),
                Some(header) => header,
            },
        };

        let _ = self.buffer.split_to(header_length);
        self.current_stage = ParseStage::MessageTimestamp;
        Ok(ParseStageResult::Success)
    }

    fn parse_timestamp(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_format == ChunkHeaderFormat::Empty {
            // An empty header re-applies the previous timestamp field as a
            // delta, but only when it starts a new message.  Continuation
            // chunks of a split message must not move the timestamp, even
            // though some encoders (OBS among them) send them after a
            // delta header.
            if !self.reassembly_in_progress(self.current_header.chunk_stream_id) {
                self.current_header.timestamp =
                    self.current_header.timestamp + self.current_header.timestamp_field;
            }

            self.current_stage = ParseStage::MessageLength;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 3 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let field = {
            let bytes = self.buffer.split_to(3);
            let mut cursor = Cursor::new(bytes);
            cursor.read_u24::<BigEndian>()?
        };

        if self.current_format == ChunkHeaderFormat::Full {
            self.current_header.timestamp.set(field);
        } else {
            // Non-full headers carry deltas only
            self.current_header.timestamp = self.current_header.timestamp + field;
        }

        self.current_header.timestamp_field = field;
        self.current_stage = ParseStage::MessageLength;
        Ok(ParseStageResult::Success)
    }

    fn parse_message_length(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_format == ChunkHeaderFormat::TimeDeltaOnly
            || self.current_format == ChunkHeaderFormat::Empty
        {
            self.current_stage = ParseStage::MessageTypeId;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 3 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let length = {
            let bytes = self.buffer.split_to(3);
            let mut cursor = Cursor::new(bytes);
            cursor.read_u24::<BigEndian>()?
        };

        if length > self.max_message_length {
            return Err(ChunkDeserializationError::MessageTooLong {
                length,
                maximum: self.max_message_length,
            });
        }

        self.current_header.message_length = length;
        self.current_stage = ParseStage::MessageTypeId;
        Ok(ParseStageResult::Success)
    }

    fn parse_message_type_id(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_format == ChunkHeaderFormat::TimeDeltaOnly
            || self.current_format == ChunkHeaderFormat::Empty
        {
            self.current_stage = ParseStage::MessageStreamId;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.is_empty() {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        self.current_header.message_type_id = self.buffer[0];
        let _ = self.buffer.split_to(1);
        self.current_stage = ParseStage::MessageStreamId;
        Ok(ParseStageResult::Success)
    }

    fn parse_message_stream_id(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_format != ChunkHeaderFormat::Full {
            self.current_stage = ParseStage::ExtendedTimestamp;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 4 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let stream_id = {
            let bytes = self.buffer.split_to(4);
            let mut cursor = Cursor::new(bytes);
            cursor.read_u32::<LittleEndian>()?
        };

        self.current_header.message_stream_id = stream_id;
        self.current_stage = ParseStage::ExtendedTimestamp;
        Ok(ParseStageResult::Success)
    }

    fn parse_extended_timestamp(&mut self) -> Result<ParseStageResult, ChunkDeserializationError> {
        if self.current_header.timestamp_field < EXTENDED_TIMESTAMP_SENTINEL {
            self.current_stage = ParseStage::MessagePayload;
            return Ok(ParseStageResult::Success);
        }

        if self.buffer.len() < 4 {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let extended = {
            let bytes = self.buffer.split_to(4);
            let mut cursor = Cursor::new(bytes);
            cursor.read_u32::<BigEndian>()?
        };

        if self.current_format == ChunkHeaderFormat::Full {
            self.current_header.timestamp.set(extended);
        } else if !self.reassembly_in_progress(self.current_header.chunk_stream_id) {
            // The sentinel was already applied as the delta, so only the
            // difference remains.  A continuation chunk repeats the extended
            // timestamp but its value was accounted for on the first chunk.
            self.current_header.timestamp =
                self.current_header.timestamp + (extended - EXTENDED_TIMESTAMP_SENTINEL);
        }

        self.current_stage = ParseStage::MessagePayload;
        Ok(ParseStageResult::Success)
    }

    fn parse_payload(
        &mut self,
        message_to_return: &mut Option<MessagePayload>,
    ) -> Result<ParseStageResult, ChunkDeserializationError> {
        let csid = self.current_header.chunk_stream_id;
        let total_length = self.current_header.message_length as usize;
        let buffered_so_far = self
            .reassembly_buffers
            .get(&csid)
            .map_or(0, |buffer| buffer.len());
        let chunk_length = min(total_length - buffered_so_far, self.max_chunk_size);

        if self.buffer.len() < chunk_length {
            return Ok(ParseStageResult::NotEnoughBytes);
        }

        let chunk = self.buffer.split_to(chunk_length);
        let assembly = self.reassembly_buffers.entry(csid).or_default();
        if assembly.is_empty() {
            assembly.reserve(total_length);
        }

        assembly.extend_from_slice(&chunk[..]);

        if assembly.len() == total_length {
            let data = mem::take(assembly).freeze();
            self.reassembly_buffers.remove(&csid);

            *message_to_return = Some(MessagePayload {
                timestamp: self.current_header.timestamp,
                type_id: self.current_header.message_type_id,
                message_stream_id: self.current_header.message_stream_id,
                data,
            });
        }

        // The chunk is finished, so cycle its header into the per-stream map
        // and start over on the next basic header
        let current_header = mem::replace(&mut self.current_header, ChunkHeader::new());
        self.previous_headers
            .insert(current_header.chunk_stream_id, current_header);
        self.current_stage = ParseStage::BasicHeader;
        Ok(ParseStageResult::Success)
    }
}
