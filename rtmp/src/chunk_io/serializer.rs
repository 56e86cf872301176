use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use crate::chunk_io::ChunkSerializationError;
use crate::messages::{MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use std::cmp::min;
use std::collections::HashMap;
use std::io::{Cursor, Write};

const INITIAL_MAX_CHUNK_SIZE: u32 = 128;
const MAX_CHUNK_SIZE: u32 = 16777215;
const MAX_MESSAGE_LENGTH: usize = 16777215;
const EXTENDED_TIMESTAMP_SENTINEL: u32 = 16777215;

/// An outbound data packet containing at least one RTMP chunk carrying a
/// single RTMP message.  A packet can be flagged as droppable: audio and
/// video packets may be shed when the peer cannot keep up with the current
/// bitrate, which keeps live video real-time instead of backing up.
#[derive(Debug, PartialEq)]
pub struct Packet {
    pub bytes: Vec<u8>,
    pub can_be_dropped: bool,
}

/// Allows serializing RTMP messages into RTMP chunks.
///
/// Due to the nature of the RTMP chunking protocol, the same serializer must
/// be used for every message sent to one peer, and the resulting packets
/// must go out in the order they were produced.
pub struct ChunkSerializer {
    previous_headers: HashMap<u32, ChunkHeader>,
    max_chunk_size: u32,
}

impl ChunkSerializer {
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            previous_headers: HashMap::new(),
            max_chunk_size: INITIAL_MAX_CHUNK_SIZE,
        }
    }

    /// Changes the outbound chunk size.  Returns the `SetChunkSize` packet
    /// that must be sent to the peer; the packet itself is serialized at the
    /// old chunk size and the new size applies to every packet after it.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Packet, ChunkSerializationError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkSerializationError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        let message = RtmpMessage::SetChunkSize { size: new_size };
        let payload = message.into_message_payload(time, 0)?;
        let packet = self.serialize(&payload, true, false)?;

        self.max_chunk_size = new_size;
        Ok(packet)
    }

    /// Serializes a message onto the default chunk stream for its message
    /// type.  Control messages ride on chunk stream 2, data on 3, video on
    /// 4, audio on 5, and everything else on 6, which spreads repeating
    /// traffic across chunk streams so header compression can do its work.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
        can_be_dropped: bool,
    ) -> Result<Packet, ChunkSerializationError> {
        let csid = default_chunk_stream_id(message.type_id);
        self.serialize_to_stream(message, csid, force_uncompressed, can_be_dropped)
    }

    /// Serializes a message onto an explicitly chosen chunk stream id.
    pub fn serialize_to_stream(
        &mut self,
        message: &MessagePayload,
        csid: u32,
        force_uncompressed: bool,
        can_be_dropped: bool,
    ) -> Result<Packet, ChunkSerializationError> {
        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong {
                size: message.data.len(),
            });
        }

        if !(2..=65599).contains(&csid) {
            return Err(ChunkSerializationError::InvalidChunkStreamId { csid });
        }

        let mut header = ChunkHeader {
            chunk_stream_id: csid,
            timestamp: message.timestamp,
            timestamp_field: message.timestamp.value,
            message_length: message.data.len() as u32,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
            can_be_dropped,
        };

        let format = if force_uncompressed {
            ChunkHeaderFormat::Full
        } else {
            match self.previous_headers.get(&csid) {
                None => ChunkHeaderFormat::Full,

                Some(previous) => {
                    // If the previous packet was allowed to be dropped we
                    // don't know whether it actually went out, so this one
                    // cannot lean on its header
                    if previous.can_be_dropped {
                        ChunkHeaderFormat::Full
                    } else {
                        let format = get_header_format(&header, previous);
                        header.timestamp_field = match format {
                            ChunkHeaderFormat::Full => message.timestamp.value,
                            ChunkHeaderFormat::Empty => previous.timestamp_field,
                            _ => (message.timestamp - previous.timestamp).value,
                        };

                        format
                    }
                }
            }
        };

        let mut bytes = Cursor::new(Vec::new());

        // The leading chunk carries the header and as much payload as fits;
        // the rest goes out in format 3 continuation chunks
        let first_chunk_length = min(message.data.len(), self.max_chunk_size as usize);
        write_chunk(&mut bytes, &format, &header, &message.data[..first_chunk_length])?;

        let mut index = first_chunk_length;
        while index < message.data.len() {
            let end = min(index + self.max_chunk_size as usize, message.data.len());
            write_chunk(
                &mut bytes,
                &ChunkHeaderFormat::Empty,
                &header,
                &message.data[index..end],
            )?;
            index = end;
        }

        self.previous_headers.insert(csid, header);

        Ok(Packet {
            bytes: bytes.into_inner(),
            can_be_dropped,
        })
    }
}

fn write_chunk(
    bytes: &mut Cursor<Vec<u8>>,
    format: &ChunkHeaderFormat,
    header: &ChunkHeader,
    data: &[u8],
) -> Result<(), ChunkSerializationError> {
    write_basic_header(bytes, format, header.chunk_stream_id)?;

    if *format != ChunkHeaderFormat::Empty {
        let capped_field = min(header.timestamp_field, EXTENDED_TIMESTAMP_SENTINEL);
        bytes.write_u24::<BigEndian>(capped_field)?;
    }

    if *format == ChunkHeaderFormat::Full
        || *format == ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId
    {
        bytes.write_u24::<BigEndian>(header.message_length)?;
        bytes.write_u8(header.message_type_id)?;
    }

    if *format == ChunkHeaderFormat::Full {
        bytes.write_u32::<LittleEndian>(header.message_stream_id)?;
    }

    // Whenever the 24 bit field saturates the real value follows as a 32 bit
    // extended timestamp, and continuation chunks repeat it
    if header.timestamp_field >= EXTENDED_TIMESTAMP_SENTINEL {
        bytes.write_u32::<BigEndian>(header.timestamp_field)?;
    }

    bytes.write_all(data)?;
    Ok(())
}

fn write_basic_header(
    bytes: &mut Cursor<Vec<u8>>,
    format: &ChunkHeaderFormat,
    csid: u32,
) -> Result<(), ChunkSerializationError> {
    let format_mask = match *format {
        ChunkHeaderFormat::Full => 0b00000000,
        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b01000000,
        ChunkHeaderFormat::TimeDeltaOnly => 0b10000000,
        ChunkHeaderFormat::Empty => 0b11000000,
    };

    if csid <= 63 {
        bytes.write_u8(format_mask | csid as u8)?;
    } else if csid <= 319 {
        bytes.write_u8(format_mask)?;
        bytes.write_u8((csid - 64) as u8)?;
    } else {
        bytes.write_u8(format_mask | 1)?;
        bytes.write_u16::<LittleEndian>((csid - 64) as u16)?;
    }

    Ok(())
}

fn default_chunk_stream_id(message_type_id: u8) -> u32 {
    match message_type_id {
        1..=6 => 2,
        15 | 18 | 19 => 3,
        9 => 4,
        8 => 5,
        _ => 6,
    }
}

fn get_header_format(current: &ChunkHeader, previous: &ChunkHeader) -> ChunkHeaderFormat {
    if current.message_stream_id != previous.message_stream_id {
        return ChunkHeaderFormat::Full;
    }

    if current.message_type_id != previous.message_type_id
        || current.message_length != previous.message_length
    {
        return ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId;
    }

    // An empty header makes the peer re-apply the previous chunk's timestamp
    // field as a delta, so it is only valid when that reproduces this
    // message's timestamp exactly
    if (current.timestamp - previous.timestamp).value != previous.timestamp_field {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
    use std::io::{Cursor, Read};

    fn test_message(timestamp: u32, type_id: u8, stream_id: u32, data: Vec<u8>) -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(timestamp),
            type_id,
            message_stream_id: stream_id,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn full_header_for_first_message_with_small_timestamp() {
        let message = test_message(72, 50, 12, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 72, "Unexpected timestamp");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 4, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected stream id");

        let mut payload = [0_u8; 10];
        let bytes_read = cursor.read(&mut payload).unwrap();
        assert_eq!(&payload[..bytes_read], &[1, 2, 3, 4], "Unexpected payload");
    }

    #[test]
    fn full_header_with_extended_timestamp() {
        let message = test_message(16777216, 50, 12, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(
            cursor.read_u24::<BigEndian>().unwrap(),
            16777215,
            "Unexpected timestamp field"
        );
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 4, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected stream id");
        assert_eq!(
            cursor.read_u32::<BigEndian>().unwrap(),
            16777216,
            "Unexpected extended timestamp"
        );
    }

    #[test]
    fn delta_header_for_second_message_with_different_length_and_type() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 51, 12, vec![1, 2, 3]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let packet = serializer.serialize(&message2, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b01000000, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 10, "Unexpected delta");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 3, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 51, "Unexpected type id");

        let mut payload = [0_u8; 10];
        let bytes_read = cursor.read(&mut payload).unwrap();
        assert_eq!(&payload[..bytes_read], &[1, 2, 3], "Unexpected payload");
    }

    #[test]
    fn delta_only_header_for_second_message_with_matching_length_and_type() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 50, 12, vec![5, 6, 7, 8]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let packet = serializer.serialize(&message2, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b10000000, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 10, "Unexpected delta");

        let mut payload = [0_u8; 10];
        let bytes_read = cursor.read(&mut payload).unwrap();
        assert_eq!(&payload[..bytes_read], &[5, 6, 7, 8], "Unexpected payload");
    }

    #[test]
    fn empty_header_for_third_message_repeating_the_same_delta() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 50, 12, vec![5, 6, 7, 8]);
        let message3 = test_message(92, 50, 12, vec![9, 10, 11, 12]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let _ = serializer.serialize(&message2, false, false).unwrap();
        let packet = serializer.serialize(&message3, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b11000000, "Unexpected basic header");

        let mut payload = [0_u8; 10];
        let bytes_read = cursor.read(&mut payload).unwrap();
        assert_eq!(&payload[..bytes_read], &[9, 10, 11, 12], "Unexpected payload");
    }

    #[test]
    fn identical_timestamps_after_full_header_do_not_produce_empty_header() {
        // An empty header would make the peer re-apply the full header's
        // absolute timestamp as a delta, so a delta-only header is required
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(72, 50, 12, vec![5, 6, 7, 8]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let packet = serializer.serialize(&message2, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b10000000, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 0, "Unexpected delta");
    }

    #[test]
    fn full_header_used_when_message_stream_id_changes() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 50, 13, vec![5, 6, 7, 8]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let packet = serializer.serialize(&message2, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
    }

    #[test]
    fn full_header_when_forcing_uncompressed() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 50, 12, vec![5, 6, 7, 8]);

        let mut serializer = ChunkSerializer::new();
        let _ = serializer.serialize(&message1, false, false).unwrap();
        let packet = serializer.serialize(&message2, true, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 82, "Unexpected timestamp");
    }

    #[test]
    fn full_header_after_droppable_packet() {
        let message1 = test_message(72, 50, 12, vec![1, 2, 3, 4]);
        let message2 = test_message(82, 50, 12, vec![5, 6, 7, 8]);

        let mut serializer = ChunkSerializer::new();
        let packet1 = serializer.serialize(&message1, false, true).unwrap();
        assert!(packet1.can_be_dropped, "First packet should be droppable");

        let packet2 = serializer.serialize(&message2, false, false).unwrap();
        assert!(!packet2.can_be_dropped, "Second packet should not be droppable");

        let mut cursor = Cursor::new(packet2.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 82, "Unexpected timestamp");
    }

    #[test]
    fn message_exceeding_chunk_size_is_split_with_continuation_chunks() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&[11_u8; 75]);
        payload.extend_from_slice(&[22_u8; 25]);

        let message = test_message(72, 50, 12, payload);

        let mut serializer = ChunkSerializer::new();
        serializer.set_max_chunk_size(75, RtmpTimestamp::new(0)).unwrap();
        let packet = serializer.serialize(&message, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 72, "Unexpected timestamp");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 100, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected stream id");

        let mut first_part = [0_u8; 75];
        cursor.read_exact(&mut first_part).unwrap();
        assert_eq!(&first_part[..], &[11_u8; 75][..], "Unexpected first chunk payload");

        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b11000000, "Unexpected continuation header");

        let mut second_part = [0_u8; 25];
        cursor.read_exact(&mut second_part).unwrap();
        assert_eq!(&second_part[..], &[22_u8; 25][..], "Unexpected second chunk payload");
    }

    #[test]
    fn split_message_with_extended_timestamp_repeats_it_on_continuations() {
        let message = test_message(16777216, 50, 12, vec![7_u8; 10]);

        let mut serializer = ChunkSerializer::new();
        serializer.set_max_chunk_size(6, RtmpTimestamp::new(0)).unwrap();
        let packet = serializer.serialize(&message, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 16777215, "Unexpected field");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 10, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 50, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 12, "Unexpected stream id");
        assert_eq!(
            cursor.read_u32::<BigEndian>().unwrap(),
            16777216,
            "Unexpected extended timestamp"
        );

        let mut first_part = [0_u8; 6];
        cursor.read_exact(&mut first_part).unwrap();

        assert_eq!(cursor.read_u8().unwrap(), 6 | 0b11000000, "Unexpected continuation header");
        assert_eq!(
            cursor.read_u32::<BigEndian>().unwrap(),
            16777216,
            "Continuation chunk should repeat the extended timestamp"
        );

        let mut second_part = [0_u8; 4];
        cursor.read_exact(&mut second_part).unwrap();
        assert_eq!(&second_part[..], &[7_u8; 4][..], "Unexpected second chunk payload");
    }

    #[test]
    fn explicit_chunk_stream_id_uses_two_byte_encoding() {
        let message = test_message(72, 50, 12, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize_to_stream(&message, 300, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 0, "Unexpected basic header byte");
        assert_eq!(cursor.read_u8().unwrap(), (300 - 64) as u8, "Unexpected csid byte");
    }

    #[test]
    fn explicit_chunk_stream_id_uses_three_byte_encoding() {
        let message = test_message(72, 50, 12, vec![1, 2, 3, 4]);

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize_to_stream(&message, 50000, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 1, "Unexpected basic header byte");
        assert_eq!(
            cursor.read_u16::<LittleEndian>().unwrap(),
            (50000 - 64) as u16,
            "Unexpected csid bytes"
        );
    }

    #[test]
    fn error_for_unencodable_chunk_stream_id() {
        let message = test_message(72, 50, 12, vec![1]);

        let mut serializer = ChunkSerializer::new();
        match serializer.serialize_to_stream(&message, 1, false, false) {
            Err(ChunkSerializationError::InvalidChunkStreamId { csid: 1 }) => (),
            x => panic!("Expected InvalidChunkStreamId, instead got {:?}", x),
        }
    }

    #[test]
    fn zero_length_message_still_produces_one_chunk() {
        let message = test_message(72, 50, 12, Vec::new());

        let mut serializer = ChunkSerializer::new();
        let packet = serializer.serialize(&message, false, false).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 6, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 72, "Unexpected timestamp");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 0, "Unexpected length");
    }

    #[test]
    fn changing_chunk_size_returns_set_chunk_size_packet() {
        let mut serializer = ChunkSerializer::new();
        let packet = serializer.set_max_chunk_size(75, RtmpTimestamp::new(152)).unwrap();

        let mut cursor = Cursor::new(packet.bytes);
        assert_eq!(cursor.read_u8().unwrap(), 2, "Unexpected basic header");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 152, "Unexpected timestamp");
        assert_eq!(cursor.read_u24::<BigEndian>().unwrap(), 4, "Unexpected length");
        assert_eq!(cursor.read_u8().unwrap(), 1, "Unexpected type id");
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0, "Unexpected stream id");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 75, "Unexpected chunk size");
    }

    #[test]
    fn error_when_chunk_size_out_of_range() {
        let mut serializer = ChunkSerializer::new();
        match serializer.set_max_chunk_size(16777216, RtmpTimestamp::new(0)) {
            Err(ChunkSerializationError::InvalidMaxChunkSize {
                chunk_size: 16777216,
            }) => (),
            x => panic!("Expected InvalidMaxChunkSize, instead got {:?}", x),
        }
    }
}
