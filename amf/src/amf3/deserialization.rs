//! This module contains functionality to deserialize values from bytes
//! that were encoded via the AMF3 specification.

use super::markers;
use crate::errors::AmfDeserializationError;
use crate::AmfValue;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Turns any readable byte stream into the sequence of AMF3 values it encodes.
///
/// The string, complex value, and trait reference tables are local to this
/// call, so values referenced more than once decode to equal copies and
/// references never surface in the result.
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<AmfValue>, AmfDeserializationError> {
    let mut decoder = Decoder::new();
    let mut results = vec![];

    loop {
        let mut buffer: [u8; 1] = [0];
        let bytes_read = bytes.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        results.push(decoder.read_value_for_marker(buffer[0], bytes)?);
    }

    Ok(results)
}

/// Reads exactly one AMF3 value with fresh reference tables.  Used for the
/// AMF0 avmplus switch marker, which wraps a single AMF3 value.
pub(crate) fn deserialize_value<R: Read>(
    bytes: &mut R,
) -> Result<AmfValue, AmfDeserializationError> {
    let mut decoder = Decoder::new();
    let marker = bytes.read_u8()?;
    decoder.read_value_for_marker(marker, bytes)
}

enum LengthOrIndex {
    Length(usize),
    Index(usize),
}

#[derive(Clone)]
struct ObjectTrait {
    class_name: Option<String>,
    is_dynamic: bool,
    field_names: Vec<String>,
}

struct Decoder {
    strings: Vec<String>,
    complex_values: Vec<Option<AmfValue>>,
    traits: Vec<ObjectTrait>,
}

impl Decoder {
    fn new() -> Decoder {
        Decoder {
            strings: Vec::new(),
            complex_values: Vec::new(),
            traits: Vec::new(),
        }
    }

    fn read_value<R: Read>(&mut self, bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
        let marker = bytes.read_u8()?;
        self.read_value_for_marker(marker, bytes)
    }

    fn read_value_for_marker<R: Read>(
        &mut self,
        marker: u8,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        match marker {
            markers::UNDEFINED => Ok(AmfValue::Undefined),
            markers::NULL => Ok(AmfValue::Null),
            markers::FALSE => Ok(AmfValue::Boolean(false)),
            markers::TRUE => Ok(AmfValue::Boolean(true)),
            markers::INTEGER => self.read_integer(bytes),
            markers::DOUBLE => Ok(AmfValue::Number(bytes.read_f64::<BigEndian>()?)),
            markers::STRING => Ok(AmfValue::Utf8String(self.read_utf8(bytes)?)),
            markers::XML_DOCUMENT => self.read_xml_document(bytes),
            markers::DATE => self.read_date(bytes),
            markers::ARRAY => self.read_array(bytes),
            markers::OBJECT => self.read_object(bytes),
            markers::XML => self.read_xml_document(bytes),
            markers::BYTE_ARRAY => self.read_byte_array(bytes),
            _ => Err(AmfDeserializationError::UnknownMarker { marker }),
        }
    }

    fn read_u29<R: Read>(&mut self, bytes: &mut R) -> Result<u32, AmfDeserializationError> {
        let mut result: u32 = 0;
        for _ in 0..3 {
            let byte = bytes.read_u8()?;
            result = (result << 7) | ((byte as u32) & 0x7f);
            if (byte & 0x80) == 0 {
                return Ok(result);
            }
        }

        // The fourth byte carries all eight of its bits
        let byte = bytes.read_u8()?;
        Ok((result << 8) | (byte as u32))
    }

    fn read_length_or_index<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<LengthOrIndex, AmfDeserializationError> {
        let header = self.read_u29(bytes)? as usize;
        if (header & 0x01) == 0 {
            Ok(LengthOrIndex::Index(header >> 1))
        } else {
            Ok(LengthOrIndex::Length(header >> 1))
        }
    }

    fn read_integer<R: Read>(&mut self, bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
        let raw = self.read_u29(bytes)? as i32;

        // Values at or above 2^28 are the two's complement spelling of a
        // negative 29 bit integer
        let value = if raw >= (1 << 28) {
            raw - (1 << 29)
        } else {
            raw
        };

        Ok(AmfValue::Integer(value))
    }

    fn read_raw_bytes<R: Read>(
        &mut self,
        bytes: &mut R,
        length: usize,
    ) -> Result<Vec<u8>, AmfDeserializationError> {
        let mut buffer = vec![0; length];
        bytes.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn read_utf8<R: Read>(&mut self, bytes: &mut R) -> Result<String, AmfDeserializationError> {
        match self.read_length_or_index(bytes)? {
            LengthOrIndex::Index(index) => match self.strings.get(index) {
                Some(value) => Ok(value.clone()),
                None => Err(AmfDeserializationError::ReferenceOutOfRange { index }),
            },

            LengthOrIndex::Length(length) => {
                let buffer = self.read_raw_bytes(bytes, length)?;
                let value = String::from_utf8(buffer)?;

                // The empty string is never recorded in the table
                if !value.is_empty() {
                    self.strings.push(value.clone());
                }

                Ok(value)
            }
        }
    }

    /// Resolves a complex value header: either a reference into the complex
    /// value table, or a literal whose body is decoded by `parse` with its
    /// table slot reserved up front (the reservation is what makes circular
    /// references detectable).
    fn read_complex<R, F>(
        &mut self,
        bytes: &mut R,
        parse: F,
    ) -> Result<AmfValue, AmfDeserializationError>
    where
        R: Read,
        F: FnOnce(&mut Self, &mut R, usize) -> Result<AmfValue, AmfDeserializationError>,
    {
        match self.read_length_or_index(bytes)? {
            LengthOrIndex::Index(index) => match self.complex_values.get(index) {
                Some(Some(value)) => Ok(value.clone()),
                Some(None) => Err(AmfDeserializationError::CircularReference { index }),
                None => Err(AmfDeserializationError::ReferenceOutOfRange { index }),
            },

            LengthOrIndex::Length(length) => {
                let index = self.complex_values.len();
                self.complex_values.push(None);
                let value = parse(self, bytes, length)?;
                self.complex_values[index] = Some(value.clone());
                Ok(value)
            }
        }
    }

    fn read_xml_document<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        self.read_complex(bytes, |decoder, bytes, length| {
            let buffer = decoder.read_raw_bytes(bytes, length)?;
            Ok(AmfValue::XmlDocument(String::from_utf8(buffer)?))
        })
    }

    fn read_date<R: Read>(&mut self, bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
        self.read_complex(bytes, |_, bytes, _| {
            let unix_ms = bytes.read_f64::<BigEndian>()?;
            Ok(AmfValue::Date { unix_ms })
        })
    }

    fn read_byte_array<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<AmfValue, AmfDeserializationError> {
        self.read_complex(bytes, |decoder, bytes, length| {
            let buffer = decoder.read_raw_bytes(bytes, length)?;
            Ok(AmfValue::ByteArray(buffer))
        })
    }

    fn read_pairs<R: Read>(
        &mut self,
        bytes: &mut R,
    ) -> Result<Vec<(String, AmfValue)>, AmfDeserializationError> {
        let mut pairs = Vec::new();
        loop {
            let key = self.read_utf8(bytes)?;
            if key.is_empty() {
                return Ok(pairs);
            }

            let value = self.read_value(bytes)?;
            pairs.push((key, value));
        }
    }

    fn read_array<R: Read>(&mut self, bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
        self.read_complex(bytes, |decoder, bytes, dense_count| {
            let assoc = decoder.read_pairs(bytes)?;
            let mut dense = Vec::with_capacity(dense_count);
            for _ in 0..dense_count {
                dense.push(decoder.read_value(bytes)?);
            }

            Ok(AmfValue::Array { dense, assoc })
        })
    }

    fn read_trait<R: Read>(
        &mut self,
        bytes: &mut R,
        header: usize,
    ) -> Result<ObjectTrait, AmfDeserializationError> {
        // The complex header's literal bit is already consumed; the next bit
        // distinguishes a trait reference from a trait literal.
        if (header & 0x01) == 0 {
            let index = header >> 1;
            return match self.traits.get(index) {
                Some(object_trait) => Ok(object_trait.clone()),
                None => Err(AmfDeserializationError::ReferenceOutOfRange { index }),
            };
        }

        if (header & 0x02) != 0 {
            let class_name = self.read_utf8(bytes)?;
            return Err(AmfDeserializationError::UnsupportedExternalizable { class_name });
        }

        let is_dynamic = (header & 0x04) != 0;
        let field_count = header >> 3;
        let class_name = self.read_utf8(bytes)?;

        let mut field_names = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            field_names.push(self.read_utf8(bytes)?);
        }

        let object_trait = ObjectTrait {
            class_name: if class_name.is_empty() {
                None
            } else {
                Some(class_name)
            },
            is_dynamic,
            field_names,
        };

        self.traits.push(object_trait.clone());
        Ok(object_trait)
    }

    fn read_object<R: Read>(&mut self, bytes: &mut R) -> Result<AmfValue, AmfDeserializationError> {
        self.read_complex(bytes, |decoder, bytes, header| {
            let object_trait = decoder.read_trait(bytes, header)?;

            let mut properties = Vec::new();
            for name in &object_trait.field_names {
                let value = decoder.read_value(bytes)?;
                properties.push((name.clone(), value));
            }

            if object_trait.is_dynamic {
                properties.extend(decoder.read_pairs(bytes)?);
            }

            match object_trait.class_name {
                Some(class_name) => Ok(AmfValue::TypedObject {
                    class_name,
                    properties,
                }),
                None => Ok(AmfValue::Object(properties)),
            }
        })
    }
}
