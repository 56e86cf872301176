pub mod abort;
pub mod acknowledgement;
pub mod amf0_command;
pub mod amf0_data;
pub mod amf3_command;
pub mod amf3_data;
pub mod audio_data;
pub mod set_chunk_size;
pub mod set_peer_bandwidth;
pub mod user_control;
pub mod video_data;
pub mod window_acknowledgement_size;

use crate::messages::MessageDeserializationError;
use riptide_amf::AmfValue;

/// The pieces every RTMP command message carries, regardless of which AMF
/// encoding it arrived in.
pub(crate) struct CommandParts {
    pub command_name: String,
    pub transaction_id: f64,
    pub command_object: AmfValue,
    pub additional_arguments: Vec<AmfValue>,
}

/// Splits a decoded AMF value sequence into command name, transaction id,
/// command object, and whatever additional values follow.
pub(crate) fn split_command_values(
    values: Vec<AmfValue>,
) -> Result<CommandParts, MessageDeserializationError> {
    let mut iterator = values.into_iter();

    let command_name = match iterator.next() {
        Some(AmfValue::Utf8String(name)) => name,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    // AMF3 encoders are free to spell small transaction ids as integers
    let transaction_id = match iterator.next() {
        Some(AmfValue::Number(value)) => value,
        Some(AmfValue::Integer(value)) => value as f64,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let command_object = match iterator.next() {
        Some(value) => value,
        None => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    Ok(CommandParts {
        command_name,
        transaction_id,
        command_object,
        additional_arguments: iterator.collect(),
    })
}
