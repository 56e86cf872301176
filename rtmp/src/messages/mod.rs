//! Encoding and decoding of each RTMP message type, plus the raw
//! [`MessagePayload`] form that bridges messages and the chunk layer.

mod deserialization_errors;
mod message_payload;
mod serialization_errors;
mod types;

pub use self::deserialization_errors::MessageDeserializationError;
pub use self::message_payload::MessagePayload;
pub use self::serialization_errors::MessageSerializationError;

use crate::time::RtmpTimestamp;
use bytes::Bytes;
use riptide_amf::AmfValue;

/// How strictly the peer should observe a `SetPeerBandwidth` limit.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PeerBandwidthLimitType {
    Hard,
    Soft,
    Dynamic,
}

/// The event types a UserControl message can carry.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum UserControlEventType {
    StreamBegin,
    StreamEof,
    StreamDry,
    SetBufferLength,
    StreamIsRecorded,
    PingRequest,
    PingResponse,
}

/// Every RTMP message type the engine understands, in decoded form.
/// Message types it does not understand round-trip as `Unknown` so they can
/// be logged or forwarded verbatim.
#[derive(PartialEq, Debug, Clone)]
pub enum RtmpMessage {
    Unknown {
        type_id: u8,
        data: Bytes,
    },

    Abort {
        stream_id: u32,
    },

    Acknowledgement {
        sequence_number: u32,
    },

    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: AmfValue,
        additional_arguments: Vec<AmfValue>,
    },

    Amf3Command {
        command_name: String,
        transaction_id: f64,
        command_object: AmfValue,
        additional_arguments: Vec<AmfValue>,
    },

    Amf0Data {
        values: Vec<AmfValue>,
    },

    Amf3Data {
        values: Vec<AmfValue>,
    },

    AudioData {
        data: Bytes,
    },

    VideoData {
        data: Bytes,
    },

    SetChunkSize {
        size: u32,
    },

    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimitType,
    },

    UserControl {
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        buffer_length: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
    },

    WindowAcknowledgement {
        size: u32,
    },
}
