use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;
use riptide_amf::{amf0, AmfValue};
use std::io::Cursor;

pub fn serialize(
    command_name: String,
    transaction_id: f64,
    command_object: AmfValue,
    additional_arguments: Vec<AmfValue>,
) -> Result<Bytes, MessageSerializationError> {
    let mut values = vec![
        AmfValue::Utf8String(command_name),
        AmfValue::Number(transaction_id),
        command_object,
    ];

    values.extend(additional_arguments);
    let bytes = amf0::serialize(&values)?;

    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = amf0::deserialize(&mut cursor)?;
    let parts = super::split_command_values(values)?;

    Ok(RtmpMessage::Amf0Command {
        command_name: parts.command_name,
        transaction_id: parts.transaction_id,
        command_object: parts.command_object,
        additional_arguments: parts.additional_arguments,
    })
}
