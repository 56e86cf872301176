use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;
use riptide_amf::{amf3, AmfValue};
use std::io::Cursor;

pub fn serialize(values: Vec<AmfValue>) -> Result<Bytes, MessageSerializationError> {
    let bytes = amf3::serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = amf3::deserialize(&mut cursor)?;

    Ok(RtmpMessage::Amf3Data { values })
}
