use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;
use riptide_amf::{amf0, AmfValue};
use std::io::Cursor;

pub fn serialize(values: Vec<AmfValue>) -> Result<Bytes, MessageSerializationError> {
    let bytes = amf0::serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = amf0::deserialize(&mut cursor)?;

    Ok(RtmpMessage::Amf0Data { values })
}
