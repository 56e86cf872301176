use std::{io, string};
use thiserror::Error;

/// An enumeration defining every error that can occur while deserializing
/// AMF0 or AMF3 encoded values.
#[derive(Debug, Error)]
pub enum AmfDeserializationError {
    #[error("Encountered unknown marker: {marker}")]
    UnknownMarker { marker: u8 },

    #[error("Unexpected empty object property name")]
    UnexpectedEmptyObjectPropertyName,

    #[error("Hit end of the byte buffer but was expecting more data")]
    UnexpectedEof,

    #[error("Reference index {index} does not point at a previously decoded value")]
    ReferenceOutOfRange { index: usize },

    #[error("Reference index {index} points at a value whose decode has not finished")]
    CircularReference { index: usize },

    #[error("Externalizable class '{class_name}' cannot be decoded")]
    UnsupportedExternalizable { class_name: String },

    #[error("Failed to read byte buffer: {0}")]
    BufferReadError(#[from] io::Error),

    #[error("Failed to read a utf8 string from the byte buffer: {0}")]
    StringParseError(#[from] string::FromUtf8Error),
}

/// An enumeration defining every error that can occur while serializing
/// values into AMF0 or AMF3 bytes.
#[derive(Debug, Error)]
pub enum AmfSerializationError {
    #[error("Object property names cannot be longer than 65,535 bytes")]
    PropertyNameTooLong,

    #[error("Length {value} does not fit in a U29 header")]
    U29OutOfRange { value: u64 },

    #[error("Integer {value} is outside the AMF3 29 bit signed range")]
    IntegerOutOfRange { value: i32 },

    #[error("Failed to write to byte buffer: {0}")]
    BufferWriteError(#[from] io::Error),
}
