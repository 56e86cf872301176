use super::types;
use super::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use crate::time::RtmpTimestamp;
use bytes::Bytes;

/// Represents a raw RTMP message: the tuple the chunk layer produces and
/// consumes, with the payload still opaque.
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn new() -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(0),
            type_id: 0,
            message_stream_id: 0,
            data: Bytes::new(),
        }
    }

    /// Decodes the payload into the message type its type id declares.
    /// Type ids the engine does not know come back as `Unknown` rather than
    /// an error, since unrecognized traffic is not itself a protocol
    /// violation.
    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        match self.type_id {
            1 => types::set_chunk_size::deserialize(self.data.clone()),
            2 => types::abort::deserialize(self.data.clone()),
            3 => types::acknowledgement::deserialize(self.data.clone()),
            4 => types::user_control::deserialize(self.data.clone()),
            5 => types::window_acknowledgement_size::deserialize(self.data.clone()),
            6 => types::set_peer_bandwidth::deserialize(self.data.clone()),
            8 => types::audio_data::deserialize(self.data.clone()),
            9 => types::video_data::deserialize(self.data.clone()),
            15 => types::amf3_data::deserialize(self.data.clone()),
            17 => types::amf3_command::deserialize(self.data.clone()),
            18 => types::amf0_data::deserialize(self.data.clone()),
            20 => types::amf0_command::deserialize(self.data.clone()),
            _ => Ok(RtmpMessage::Unknown {
                type_id: self.type_id,
                data: self.data.clone(),
            }),
        }
    }

    /// Encodes a message into its payload form, stamped with the timestamp
    /// and message stream id it should be delivered with.
    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = get_message_type_id(&message);

        let bytes = match message {
            RtmpMessage::Unknown { data, .. } => data,

            RtmpMessage::Abort { stream_id } => types::abort::serialize(stream_id)?,

            RtmpMessage::Acknowledgement { sequence_number } => {
                types::acknowledgement::serialize(sequence_number)?
            }

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => types::amf0_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,

            RtmpMessage::Amf3Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => types::amf3_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,

            RtmpMessage::Amf0Data { values } => types::amf0_data::serialize(values)?,

            RtmpMessage::Amf3Data { values } => types::amf3_data::serialize(values)?,

            RtmpMessage::AudioData { data } => types::audio_data::serialize(data)?,

            RtmpMessage::VideoData { data } => types::video_data::serialize(data)?,

            RtmpMessage::SetChunkSize { size } => types::set_chunk_size::serialize(size)?,

            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                types::set_peer_bandwidth::serialize(size, limit_type)?
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => types::user_control::serialize(event_type, stream_id, buffer_length, timestamp)?,

            RtmpMessage::WindowAcknowledgement { size } => {
                types::window_acknowledgement_size::serialize(size)?
            }
        };

        Ok(MessagePayload {
            timestamp,
            type_id,
            message_stream_id,
            data: bytes,
        })
    }
}

impl RtmpMessage {
    /// Convenience wrapper around [`MessagePayload::from_rtmp_message`].
    pub fn into_message_payload(
        self,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        MessagePayload::from_rtmp_message(self, timestamp, message_stream_id)
    }
}

fn get_message_type_id(message: &RtmpMessage) -> u8 {
    match *message {
        RtmpMessage::Unknown { type_id, .. } => type_id,
        RtmpMessage::SetChunkSize { .. } => 1,
        RtmpMessage::Abort { .. } => 2,
        RtmpMessage::Acknowledgement { .. } => 3,
        RtmpMessage::UserControl { .. } => 4,
        RtmpMessage::WindowAcknowledgement { .. } => 5,
        RtmpMessage::SetPeerBandwidth { .. } => 6,
        RtmpMessage::AudioData { .. } => 8,
        RtmpMessage::VideoData { .. } => 9,
        RtmpMessage::Amf3Data { .. } => 15,
        RtmpMessage::Amf3Command { .. } => 17,
        RtmpMessage::Amf0Data { .. } => 18,
        RtmpMessage::Amf0Command { .. } => 20,
    }
}

#[cfg(test)]
mod tests {
    use super::{MessagePayload, RtmpMessage};
    use crate::messages::{PeerBandwidthLimitType, UserControlEventType};
    use crate::time::RtmpTimestamp;
    use bytes::Bytes;
    use riptide_amf::AmfValue;

    fn assert_round_trip(message: RtmpMessage, expected_type_id: u8) {
        let timestamp = RtmpTimestamp::new(55);
        let stream_id = 52;
        let payload =
            MessagePayload::from_rtmp_message(message.clone(), timestamp, stream_id).unwrap();

        assert_eq!(payload.type_id, expected_type_id, "Incorrect type id");
        assert_eq!(payload.timestamp, timestamp, "Incorrect timestamp");
        assert_eq!(
            payload.message_stream_id, stream_id,
            "Incorrect message stream id"
        );

        let result = payload.to_rtmp_message().unwrap();
        assert_eq!(result, message, "Message did not survive the round trip");
    }

    #[test]
    fn abort_round_trips() {
        assert_round_trip(RtmpMessage::Abort { stream_id: 23 }, 2);
    }

    #[test]
    fn acknowledgement_round_trips() {
        assert_round_trip(
            RtmpMessage::Acknowledgement {
                sequence_number: 7777,
            },
            3,
        );
    }

    #[test]
    fn amf0_command_round_trips() {
        assert_round_trip(
            RtmpMessage::Amf0Command {
                command_name: "test".to_string(),
                transaction_id: 23.0,
                command_object: AmfValue::Object(vec![(
                    "prop".to_string(),
                    AmfValue::Utf8String("abc".to_string()),
                )]),
                additional_arguments: vec![AmfValue::Boolean(true), AmfValue::Number(52.0)],
            },
            20,
        );
    }

    #[test]
    fn amf3_command_round_trips() {
        assert_round_trip(
            RtmpMessage::Amf3Command {
                command_name: "test".to_string(),
                transaction_id: 23.0,
                command_object: AmfValue::Null,
                additional_arguments: vec![AmfValue::Utf8String("value".to_string())],
            },
            17,
        );
    }

    #[test]
    fn amf0_data_round_trips() {
        assert_round_trip(
            RtmpMessage::Amf0Data {
                values: vec![AmfValue::Number(23.0), AmfValue::Null],
            },
            18,
        );
    }

    #[test]
    fn amf3_data_round_trips() {
        assert_round_trip(
            RtmpMessage::Amf3Data {
                values: vec![AmfValue::Utf8String("onMetaData".to_string())],
            },
            15,
        );
    }

    #[test]
    fn audio_data_round_trips() {
        assert_round_trip(
            RtmpMessage::AudioData {
                data: Bytes::from(vec![33_u8, 34]),
            },
            8,
        );
    }

    #[test]
    fn video_data_round_trips() {
        assert_round_trip(
            RtmpMessage::VideoData {
                data: Bytes::from(vec![23_u8]),
            },
            9,
        );
    }

    #[test]
    fn set_chunk_size_round_trips() {
        assert_round_trip(RtmpMessage::SetChunkSize { size: 4096 }, 1);
    }

    #[test]
    fn set_peer_bandwidth_round_trips() {
        assert_round_trip(
            RtmpMessage::SetPeerBandwidth {
                size: 2500000,
                limit_type: PeerBandwidthLimitType::Hard,
            },
            6,
        );
    }

    #[test]
    fn user_control_round_trips() {
        assert_round_trip(
            RtmpMessage::UserControl {
                event_type: UserControlEventType::StreamBegin,
                stream_id: Some(0),
                buffer_length: None,
                timestamp: None,
            },
            4,
        );
    }

    #[test]
    fn window_acknowledgement_round_trips() {
        assert_round_trip(RtmpMessage::WindowAcknowledgement { size: 2500000 }, 5);
    }

    #[test]
    fn unknown_type_id_round_trips_untouched() {
        assert_round_trip(
            RtmpMessage::Unknown {
                type_id: 33,
                data: Bytes::from(vec![23_u8, 24]),
            },
            33,
        );
    }
}
