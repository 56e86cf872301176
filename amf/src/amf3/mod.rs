//! The AMF3 encoding.  AMF3 leans on a 29 bit variable length integer (U29)
//! for every length and header field, and keeps three reference tables while
//! decoding: one for strings, one for complex values, and one for class
//! traits.  All three tables are scoped to a single deserialization call.

mod deserialization;
mod serialization;

pub use self::deserialization::deserialize;
pub use self::serialization::serialize;

pub(crate) use self::deserialization::deserialize_value;
pub(crate) use self::serialization::serialize_value;

pub(crate) mod markers {
    pub const UNDEFINED: u8 = 0x00;
    pub const NULL: u8 = 0x01;
    pub const FALSE: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const INTEGER: u8 = 0x04;
    pub const DOUBLE: u8 = 0x05;
    pub const STRING: u8 = 0x06;
    pub const XML_DOCUMENT: u8 = 0x07;
    pub const DATE: u8 = 0x08;
    pub const ARRAY: u8 = 0x09;
    pub const OBJECT: u8 = 0x0a;
    pub const XML: u8 = 0x0b;
    pub const BYTE_ARRAY: u8 = 0x0c;
}
