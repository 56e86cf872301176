use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;

// Video payloads are carried opaquely, same as audio.

pub fn serialize(data: Bytes) -> Result<Bytes, MessageSerializationError> {
    Ok(data)
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::VideoData { data })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::RtmpMessage;
    use bytes::Bytes;

    #[test]
    fn payload_passes_through_unchanged() {
        let data = Bytes::from(vec![9_u8, 8, 7]);

        let raw_message = serialize(data.clone()).unwrap();
        assert_eq!(raw_message, data);

        let result = deserialize(data.clone()).unwrap();
        assert_eq!(result, RtmpMessage::VideoData { data });
    }
}
