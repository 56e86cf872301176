//! Module containing functionality for serializing values into bytes based
//! on the AMF3 specification.

use super::markers;
use crate::errors::AmfSerializationError;
use crate::AmfValue;
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes values into an AMF3 encoded vector of bytes.
///
/// The encoder always writes literal values.  Reference emission is an
/// optional wire optimization, and a decoder never requires it.
pub fn serialize(values: &[AmfValue]) -> Result<Vec<u8>, AmfSerializationError> {
    let mut bytes = vec![];
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

pub(crate) fn serialize_value(
    value: &AmfValue,
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    match *value {
        AmfValue::Undefined => Ok(bytes.push(markers::UNDEFINED)),
        AmfValue::Null => Ok(bytes.push(markers::NULL)),
        AmfValue::Boolean(false) => Ok(bytes.push(markers::FALSE)),
        AmfValue::Boolean(true) => Ok(bytes.push(markers::TRUE)),
        AmfValue::Integer(val) => serialize_integer(val, bytes),
        AmfValue::Number(val) => serialize_double(val, bytes),
        AmfValue::Utf8String(ref val) => serialize_string(val, bytes),
        AmfValue::XmlDocument(ref val) => serialize_xml_document(val, bytes),
        AmfValue::Date { unix_ms } => serialize_date(unix_ms, bytes),
        AmfValue::Array {
            ref dense,
            ref assoc,
        } => serialize_array(dense, assoc, bytes),
        AmfValue::Object(ref properties) => serialize_object(None, properties, bytes),
        AmfValue::TypedObject {
            ref class_name,
            ref properties,
        } => serialize_object(Some(class_name), properties, bytes),
        AmfValue::ByteArray(ref val) => serialize_byte_array(val, bytes),
    }
}

fn write_u29(value: u32, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    match value {
        v if v < 0x80 => {
            bytes.push(v as u8);
        }

        v if v < 0x4000 => {
            bytes.push(((v >> 7) | 0x80) as u8);
            bytes.push((v & 0x7f) as u8);
        }

        v if v < 0x20_0000 => {
            bytes.push(((v >> 14) | 0x80) as u8);
            bytes.push((((v >> 7) & 0x7f) | 0x80) as u8);
            bytes.push((v & 0x7f) as u8);
        }

        v if v < 0x2000_0000 => {
            bytes.push(((v >> 22) | 0x80) as u8);
            bytes.push((((v >> 15) & 0x7f) | 0x80) as u8);
            bytes.push((((v >> 8) & 0x7f) | 0x80) as u8);
            bytes.push((v & 0xff) as u8);
        }

        _ => return Err(AmfSerializationError::U29OutOfRange {
            value: value as u64,
        }),
    }

    Ok(())
}

/// Writes a literal complex value header: the length shifted left one with
/// the low (literal) bit set.
fn write_length(length: usize, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    if length >= (1 << 28) {
        return Err(AmfSerializationError::U29OutOfRange {
            value: length as u64,
        });
    }

    write_u29(((length as u32) << 1) | 0x01, bytes)
}

fn write_utf8(value: &str, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    write_length(value.len(), bytes)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_integer(value: i32, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    if !((-(1 << 28))..(1 << 28)).contains(&value) {
        return Err(AmfSerializationError::IntegerOutOfRange { value });
    }

    let u29 = if value >= 0 {
        value as u32
    } else {
        (value + (1 << 29)) as u32
    };

    bytes.push(markers::INTEGER);
    write_u29(u29, bytes)
}

fn serialize_double(value: f64, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::DOUBLE);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::STRING);
    write_utf8(value, bytes)
}

fn serialize_xml_document(value: &str, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::XML_DOCUMENT);
    write_utf8(value, bytes)
}

fn serialize_date(unix_ms: f64, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::DATE);
    write_length(0, bytes)?;
    bytes.write_f64::<BigEndian>(unix_ms)?;
    Ok(())
}

fn serialize_byte_array(value: &[u8], bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::BYTE_ARRAY);
    write_length(value.len(), bytes)?;
    bytes.extend(value);
    Ok(())
}

fn write_pairs(
    pairs: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    for (key, value) in pairs {
        write_utf8(key, bytes)?;
        serialize_value(value, bytes)?;
    }

    // The empty key closes the associative section
    write_utf8("", bytes)
}

fn serialize_array(
    dense: &[AmfValue],
    assoc: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    bytes.push(markers::ARRAY);
    write_length(dense.len(), bytes)?;
    write_pairs(assoc, bytes)?;

    for value in dense {
        serialize_value(value, bytes)?;
    }

    Ok(())
}

fn serialize_object(
    class_name: Option<&str>,
    properties: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    bytes.push(markers::OBJECT);

    // Every property is written through the dynamic section: trait literal,
    // dynamic, zero sealed fields
    write_length(0b101, bytes)?;
    write_utf8(class_name.unwrap_or(""), bytes)?;
    write_pairs(properties, bytes)
}
