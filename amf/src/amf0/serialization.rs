//! Module containing functionality for serializing values into bytes based
//! on the AMF0 specification.

use super::markers;
use crate::amf3;
use crate::errors::AmfSerializationError;
use crate::AmfValue;
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes values into an AMF0 encoded vector of bytes.
///
/// The encoder always emits literal values, never references.
pub fn serialize(values: &[AmfValue]) -> Result<Vec<u8>, AmfSerializationError> {
    let mut bytes = vec![];
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn serialize_value(value: &AmfValue, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    match *value {
        AmfValue::Null => Ok(bytes.push(markers::NULL)),
        AmfValue::Undefined => Ok(bytes.push(markers::UNDEFINED)),
        AmfValue::Boolean(val) => Ok(serialize_bool(val, bytes)),
        AmfValue::Number(val) => serialize_number(val, bytes),
        AmfValue::Utf8String(ref val) => serialize_string(val, bytes),
        AmfValue::XmlDocument(ref val) => serialize_xml_document(val, bytes),
        AmfValue::Date { unix_ms } => serialize_date(unix_ms, bytes),
        AmfValue::Object(ref properties) => serialize_object(properties, bytes),
        AmfValue::TypedObject {
            ref class_name,
            ref properties,
        } => serialize_typed_object(class_name, properties, bytes),
        AmfValue::Array {
            ref dense,
            ref assoc,
        } => serialize_array(dense, assoc, bytes),

        // AMF3-only kinds go out behind the avmplus switch marker so they
        // survive an AMF0 round trip.
        AmfValue::Integer(_) | AmfValue::ByteArray(_) => {
            bytes.push(markers::AVMPLUS);
            amf3::serialize_value(value, bytes)
        }
    }
}

fn serialize_number(value: f64, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::NUMBER);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_bool(value: bool, bytes: &mut Vec<u8>) {
    bytes.push(markers::BOOLEAN);
    bytes.push(value as u8);
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    if value.len() > (u16::MAX as usize) {
        bytes.push(markers::LONG_STRING);
        bytes.write_u32::<BigEndian>(value.len() as u32)?;
    } else {
        bytes.push(markers::STRING);
        bytes.write_u16::<BigEndian>(value.len() as u16)?;
    }

    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_xml_document(value: &str, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::XML_DOCUMENT);
    bytes.write_u32::<BigEndian>(value.len() as u32)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_date(unix_ms: f64, bytes: &mut Vec<u8>) -> Result<(), AmfSerializationError> {
    bytes.push(markers::DATE);
    bytes.write_f64::<BigEndian>(unix_ms)?;
    bytes.write_i16::<BigEndian>(0)?;
    Ok(())
}

fn serialize_properties(
    properties: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    for (name, value) in properties {
        if name.len() > (u16::MAX as usize) {
            return Err(AmfSerializationError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY)?;
    bytes.push(markers::OBJECT_END);
    Ok(())
}

fn serialize_object(
    properties: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    bytes.push(markers::OBJECT);
    serialize_properties(properties, bytes)
}

fn serialize_typed_object(
    class_name: &str,
    properties: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    if class_name.len() > (u16::MAX as usize) {
        return Err(AmfSerializationError::PropertyNameTooLong);
    }

    bytes.push(markers::TYPED_OBJECT);
    bytes.write_u16::<BigEndian>(class_name.len() as u16)?;
    bytes.extend(class_name.as_bytes());
    serialize_properties(properties, bytes)
}

fn serialize_array(
    dense: &[AmfValue],
    assoc: &[(String, AmfValue)],
    bytes: &mut Vec<u8>,
) -> Result<(), AmfSerializationError> {
    if assoc.is_empty() {
        bytes.push(markers::STRICT_ARRAY);
        bytes.write_u32::<BigEndian>(dense.len() as u32)?;

        for value in dense {
            serialize_value(value, bytes)?;
        }

        return Ok(());
    }

    // AMF0 has no mixed array type.  Dense entries ride along under their
    // stringified indexes, which is how ActionScript itself spells them.
    bytes.push(markers::ECMA_ARRAY);
    bytes.write_u32::<BigEndian>((assoc.len() + dense.len()) as u32)?;

    for (index, value) in dense.iter().enumerate() {
        let name = index.to_string();
        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    for (name, value) in assoc {
        if name.len() > (u16::MAX as usize) {
            return Err(AmfSerializationError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY)?;
    bytes.push(markers::OBJECT_END);
    Ok(())
}
