use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;
use riptide_amf::{amf3, AmfValue};
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
    let bytes = amf3::serialize(&values)?;

    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let values = amf3::deserialize(&mut cursor)?;
    let parts = super::split_command_values(values)?;

    Ok(RtmpMessage::Amf3Command {
        command_name: parts.command_name,
        transaction_id: parts.transaction_id,
        command_object: parts.command_object,
        additional_arguments: parts.additional_arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::deserialize;
    use crate::messages::RtmpMessage;
    use bytes::Bytes;
    use riptide_amf::{amf3, AmfValue};

    #[test]
    fn can_deserialize_message_with_integer_transaction_id() {
        let values = vec![
            AmfValue::Utf8String("connect".to_string()),
            AmfValue::Integer(1),
            AmfValue::Object(vec![(
                "app".to_string(),
                AmfValue::Utf8String("live".to_string()),
            )]),
        ];

        let bytes = Bytes::from(amf3::serialize(&values).unwrap());
        let result = deserialize(bytes).unwrap();

        match result {
            RtmpMessage::Amf3Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => {
                assert_eq!(command_name, "connect", "Incorrect command name");
                assert_eq!(transaction_id, 1.0, "Incorrect transaction id");
                assert_eq!(
                    command_object.property("app"),
                    Some(&AmfValue::Utf8String("live".to_string())),
                    "Incorrect app property"
                );
                assert_eq!(additional_arguments.len(), 0, "Unexpected additional arguments");
            }

            x => panic!("Expected Amf3Command, instead got {:?}", x),
        }
    }
}
