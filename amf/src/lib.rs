//! This crate provides functionality for serializing and deserializing data
//! based on the Adobe AMF0 and AMF3 encoding specifications.  Both encodings
//! produce and consume the same [`AmfValue`] type, so values can be moved
//! between them freely (RTMP command messages may arrive in either encoding
//! but are answered in AMF0).
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use riptide_amf::{AmfValue, amf0};
//!
//! let object = AmfValue::Object(vec![
//!     ("app".to_string(), AmfValue::Utf8String("live".to_string())),
//!     ("capabilities".to_string(), AmfValue::Number(31.0)),
//! ]);
//!
//! let input = vec![AmfValue::Number(32.0), object, AmfValue::Boolean(true)];
//! let bytes = amf0::serialize(&input).unwrap();
//!
//! let mut cursor = Cursor::new(bytes);
//! let results = amf0::deserialize(&mut cursor).unwrap();
//!
//! assert_eq!(input, results);
//! ```

mod errors;

pub mod amf0;
pub mod amf3;

pub use errors::{AmfDeserializationError, AmfSerializationError};

/// An enum representing every kind of value the two AMF encodings can carry.
///
/// Object and associative array properties are kept as ordered key/value
/// pairs because AMF0 gives property insertion order wire-level significance.
///
/// `Integer` and `ByteArray` only exist in AMF3.  Serializing them as AMF0
/// wraps them in the AMF0 `avmplus` switch marker so they still round-trip.
#[derive(PartialEq, Debug, Clone)]
pub enum AmfValue {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    Integer(i32),
    Utf8String(String),
    XmlDocument(String),
    Date { unix_ms: f64 },
    Array {
        dense: Vec<AmfValue>,
        assoc: Vec<(String, AmfValue)>,
    },
    Object(Vec<(String, AmfValue)>),
    TypedObject {
        class_name: String,
        properties: Vec<(String, AmfValue)>,
    },
    ByteArray(Vec<u8>),
}

impl AmfValue {
    pub fn get_number(self) -> Option<f64> {
        match self {
            AmfValue::Number(value) => Some(value),
            AmfValue::Integer(value) => Some(value as f64),
            _ => None,
        }
    }

    pub fn get_boolean(self) -> Option<bool> {
        match self {
            AmfValue::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string(self) -> Option<String> {
        match self {
            AmfValue::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_object_properties(self) -> Option<Vec<(String, AmfValue)>> {
        match self {
            AmfValue::Object(properties) => Some(properties),
            AmfValue::TypedObject { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Looks up a property by name on an object or typed object.  The first
    /// matching key wins, mirroring how ActionScript resolves duplicates.
    pub fn property(&self, name: &str) -> Option<&AmfValue> {
        let properties = match self {
            AmfValue::Object(properties) => properties,
            AmfValue::TypedObject { properties, .. } => properties,
            _ => return None,
        };

        properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}
