//! This module contains functionality to deserialize values from bytes
//! that were encoded via the AMF0 specification.

use super::markers;
use crate::amf3;
use crate::errors::AmfDeserializationError;
use crate::AmfValue;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Turns any readable byte stream into the sequence of AMF0 values it encodes.
///
/// The reference table used to resolve the 0x07 reference marker is local to
/// this call; decoded values never contain unresolved references.
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<AmfValue>, AmfDeserializationError> {
    let mut decoder = Decoder::new();
    let mut results = vec![];

    loop {
        match decoder.read_next_value(bytes)? {
            Some(x) => results.push(x),
            None => break,
        };
    }

    Ok(results)
}

struct Decoder {
    // Complex values in the order their bodies begin.  An entry is `None`
    // while the value it stands for is still being decoded.
    complex_values: Vec<Option<AmfValue>>,
}

impl Decoder {
    fn new() -> Decoder {
        Decoder {
            complex_values: Vec::new(),
        }
    }

    fn read_next_value<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<Option<AmfValue>, AmfDeserializationError> {
        let mut buffer: [u8; 1] = [0];
        let bytes_read = bytes.read(&mut buffer)?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buffer[0] == markers::OBJECT_END {
            return Ok(None);
        }

        match buffer[0] {
            markers::NUMBER => parse_number(bytes).map(Some),
            markers::BOOLEAN => parse_bool(bytes).map(Some),
            markers::STRING => parse_string(bytes).map(Some),
            markers::OBJECT => self.parse_object(bytes).map(Some),
            markers::NULL => Ok(Some(AmfValue::Null)),
            markers::UNDEFINED => Ok(Some(AmfValue::Undefined)),
            markers::REFERENCE => self.parse_reference(bytes).map(Some),
            markers::ECMA_ARRAY => self.parse_ecma_array(bytes).map(Some),
            markers::STRICT_ARRAY => self.parse_strict_array(bytes).map(Some),
            markers::DATE => parse_date(bytes).map(Some),
            markers::LONG_STRING => parse_long_string(bytes).map(Some),
            markers::XML_DOCUMENT => parse_xml_document(bytes).map(Some),
            markers::TYPED_OBJECT => self.parse_typed_object(bytes).map(Some),
            markers::AVMPLUS => amf3::deserialize_value(bytes).map(Some),
            _ => Err(AmfDeserializationError::UnknownMarker { marker: buffer[0] }),
        }
    }

    /// Records a complex value in the reference table with its index assigned
    /// at the point its body begins, which is what the reference marker's
    /// index counts.
    fn record_complex<R, F>(
        &mut self,
        bytes: &mut R,
        parse: F,
    ) -> Result<AmfValue, AmfDeserializationError>
    where
        R: Read,
        F: FnOnce(&mut Self, &mut R) -> Result<AmfValue, AmfDeserializationError>,
    {
        let index = self.complex_values.len();
        self.complex_values.push(None);
        let value = parse(self, bytes)?;
        self.complex_values[index] = Some(value.clone());
        Ok(value)
    }

    fn parse_reference<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        let index = bytes.read_u16::<BigEndian>()? as usize;
        match self.complex_values.get(index) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(AmfDeserializationError::CircularReference { index }),
            None => Err(AmfDeserializationError::ReferenceOutOfRange { index }),
        }
    }

    fn parse_object<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        self.record_complex(bytes, |decoder, bytes| {
            let properties = decoder.parse_object_properties(bytes)?;
            Ok(AmfValue::Object(properties))
        })
    }

    fn parse_typed_object<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        self.record_complex(bytes, |decoder, bytes| {
            let class_name = read_short_string(bytes)?;
            let properties = decoder.parse_object_properties(bytes)?;
            Ok(AmfValue::TypedObject {
                class_name,
                properties,
            })
        })
    }

    fn parse_ecma_array<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        // The associative count is only a hint; real encoders terminate the
        // body with an empty key and the object end marker like a plain
        // object, so the body is read the same way.
        self.record_complex(bytes, |decoder, bytes| {
            let _associative_count = bytes.read_u32::<BigEndian>()?;
            let assoc = decoder.parse_object_properties(bytes)?;
            Ok(AmfValue::Array {
                dense: Vec::new(),
                assoc,
            })
        })
    }

    fn parse_strict_array<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        self.record_complex(bytes, |decoder, bytes| {
            let count = bytes.read_u32::<BigEndian>()?;
            let mut dense = Vec::new();

            for _ in 0..count {
                match decoder.read_next_value(bytes)? {
                    Some(value) => dense.push(value),
                    None => return Err(AmfDeserializationError::UnexpectedEof),
                };
            }

            Ok(AmfValue::Array {
                dense,
                assoc: Vec::new(),
            })
        })
    }

    fn parse_object_properties<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<Vec<(String, AmfValue)>, AmfDeserializationError> {
        let mut properties = Vec::new();

        loop {
            let label_length = bytes.read_u16::<BigEndian>()?;
            if label_length == 0 {
                // The empty label must be followed by the end of object
                // marker, and that byte has to be consumed as well.
                let byte = bytes.read_u8()?;
                if byte != markers::OBJECT_END {
                    return Err(AmfDeserializationError::UnexpectedEmptyObjectPropertyName);
                }

                return Ok(properties);
            }

            let mut label_buffer = vec![0; label_length as usize];
            bytes.read_exact(&mut label_buffer)?;
            let label = String::from_utf8(label_buffer)?;

            match self.read_next_value(bytes)? {
                Some(value) => properties.push((label, value)),
                None => return Err(AmfDeserializationError::UnexpectedEof),
            };
        }
    }
}

fn parse_number<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    let number = bytes.read_f64::<BigEndian>()?;
    Ok(AmfValue::Number(number))
}

fn parse_bool<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    let value = bytes.read_u8()?;
    Ok(AmfValue::Boolean(value != 0))
}

fn read_short_string<R: Read>(bytes: &mut R) -> Result<String, AmfDeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let mut buffer = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

fn parse_string<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    read_short_string(bytes).map(AmfValue::Utf8String)
}

fn read_long_string<R: Read>(bytes: &mut R) -> Result<String, AmfDeserializationError> {
    let length = bytes.read_u32::<BigEndian>()?;
    let mut buffer = vec![0_u8; length as usize];
    bytes.read_exact(&mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

fn parse_long_string<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    read_long_string(bytes).map(AmfValue::Utf8String)
}

fn parse_xml_document<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    read_long_string(bytes).map(AmfValue::XmlDocument)
}

fn parse_date<R: Read>(bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
    let unix_ms = bytes.read_f64::<BigEndian>()?;
    let _time_zone = bytes.read_i16::<BigEndian>()?;

    Ok(AmfValue::Date { unix_ms })
}

#[cfg(test)]
mod tests {
    use super::deserialize;
    use crate::amf0::markers;
    use crate::{AmfDeserializationError, AmfValue};
    use byteorder::{BigEndian, WriteBytesExt};
    use std::io::Cursor;

    #[test]
    fn can_deserialize_number() {
        let number: f64 = 332.0;

        let mut vector = vec![];
        vector.write_u8(markers::NUMBER).unwrap();
        vector.write_f64::<BigEndian>(number).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Number(number)]);
    }

    #[test]
    fn can_deserialize_true_boolean() {
        let vector = vec![markers::BOOLEAN, 1];

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Boolean(true)]);
    }

    #[test]
    fn can_deserialize_false_boolean() {
        let vector = vec![markers::BOOLEAN, 0];

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Boolean(false)]);
    }

    #[test]
    fn can_deserialize_string() {
        let value = "test";

        let mut vector = vec![];
        vector.write_u8(markers::STRING).unwrap();
        vector.write_u16::<BigEndian>(value.len() as u16).unwrap();
        vector.extend(value.as_bytes());

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Utf8String(value.to_string())]);
    }

    #[test]
    fn can_deserialize_long_string() {
        let value = "a".repeat(70_000);

        let mut vector = vec![];
        vector.write_u8(markers::LONG_STRING).unwrap();
        vector.write_u32::<BigEndian>(value.len() as u32).unwrap();
        vector.extend(value.as_bytes());

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Utf8String(value)]);
    }

    #[test]
    fn can_deserialize_null() {
        let mut input = Cursor::new(vec![markers::NULL]);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Null]);
    }

    #[test]
    fn can_deserialize_undefined() {
        let mut input = Cursor::new(vec![markers::UNDEFINED]);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Undefined]);
    }

    #[test]
    fn can_deserialize_object_with_property_order_preserved() {
        const NUMBER: f64 = 332.0;

        let mut vector = vec![];
        vector.push(markers::OBJECT);
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("zzzz".as_bytes());
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(NUMBER).unwrap();
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("aaaa".as_bytes());
        vector.push(markers::NULL);
        vector.write_u16::<BigEndian>(markers::UTF_8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![AmfValue::Object(vec![
            ("zzzz".to_string(), AmfValue::Number(NUMBER)),
            ("aaaa".to_string(), AmfValue::Null),
        ])];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_ecma_array() {
        let mut vector = vec![];
        vector.push(markers::ECMA_ARRAY);
        vector.write_u32::<BigEndian>(2).unwrap();
        vector.write_u16::<BigEndian>(5).unwrap();
        vector.extend("test1".as_bytes());
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.write_u16::<BigEndian>(5).unwrap();
        vector.extend("test2".as_bytes());
        vector.write_u8(markers::STRING).unwrap();
        vector.write_u16::<BigEndian>(6).unwrap();
        vector.extend("second".as_bytes());
        vector.write_u16::<BigEndian>(markers::UTF_8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![AmfValue::Array {
            dense: Vec::new(),
            assoc: vec![
                ("test1".to_string(), AmfValue::Number(1.0)),
                (
                    "test2".to_string(),
                    AmfValue::Utf8String("second".to_string()),
                ),
            ],
        }];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_strict_array() {
        let mut vector = vec![];
        vector.push(markers::STRICT_ARRAY);
        vector.write_u32::<BigEndian>(2).unwrap();
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(2.0).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![AmfValue::Array {
            dense: vec![AmfValue::Number(1.0), AmfValue::Number(2.0)],
            assoc: Vec::new(),
        }];
        assert_eq!(result, expected);
    }

    #[test]
    fn can_deserialize_date() {
        let mut vector = vec![];
        vector.push(markers::DATE);
        vector.write_f64::<BigEndian>(1234567890.0).unwrap();
        vector.write_i16::<BigEndian>(-300).unwrap(); // time zone is ignored

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(
            result,
            vec![AmfValue::Date {
                unix_ms: 1234567890.0
            }]
        );
    }

    #[test]
    fn can_deserialize_typed_object() {
        let mut vector = vec![];
        vector.push(markers::TYPED_OBJECT);
        vector.write_u16::<BigEndian>(9).unwrap();
        vector.extend("org.Thing".as_bytes());
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("prop".as_bytes());
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.write_u16::<BigEndian>(markers::UTF_8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        let expected = vec![AmfValue::TypedObject {
            class_name: "org.Thing".to_string(),
            properties: vec![("prop".to_string(), AmfValue::Number(1.0))],
        }];
        assert_eq!(result, expected);
    }

    #[test]
    fn reference_resolves_to_previously_decoded_object() {
        let mut vector = vec![];
        vector.push(markers::OBJECT);
        vector.write_u16::<BigEndian>(4).unwrap();
        vector.extend("test".as_bytes());
        vector.push(markers::NUMBER);
        vector.write_f64::<BigEndian>(1.0).unwrap();
        vector.write_u16::<BigEndian>(markers::UTF_8_EMPTY).unwrap();
        vector.push(markers::OBJECT_END);
        vector.push(markers::REFERENCE);
        vector.write_u16::<BigEndian>(0).unwrap();

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], result[1]);
    }

    #[test]
    fn reference_with_unknown_index_returns_error() {
        let mut vector = vec![markers::REFERENCE];
        vector.write_u16::<BigEndian>(5).unwrap();

        let mut input = Cursor::new(vector);
        match deserialize(&mut input) {
            Err(AmfDeserializationError::ReferenceOutOfRange { index: 5 }) => (),
            x => panic!("Expected ReferenceOutOfRange error, instead got {:?}", x),
        }
    }

    #[test]
    fn avmplus_marker_switches_to_amf3_for_one_value() {
        // 0x11 followed by an AMF3 integer marker and a 1 byte U29
        let vector = vec![markers::AVMPLUS, 0x04, 0x05, markers::NULL];

        let mut input = Cursor::new(vector);
        let result = deserialize(&mut input).unwrap();

        assert_eq!(result, vec![AmfValue::Integer(5), AmfValue::Null]);
    }

    #[test]
    fn unknown_marker_returns_error() {
        let mut input = Cursor::new(vec![0x2f_u8]);
        match deserialize(&mut input) {
            Err(AmfDeserializationError::UnknownMarker { marker: 0x2f }) => (),
            x => panic!("Expected UnknownMarker error, instead got {:?}", x),
        }
    }
}
