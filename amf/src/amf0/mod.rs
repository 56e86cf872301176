//! The AMF0 encoding, as described by the Adobe AMF0 file format
//! specification.  A buffer holds a sequence of self-describing values;
//! complex values decoded earlier in the buffer may be referred to again
//! through the reference marker.

mod deserialization;
mod serialization;

pub use self::deserialization::deserialize;
pub use self::serialization::serialize;

pub(crate) mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0a;
    pub const DATE: u8 = 0x0b;
    pub const LONG_STRING: u8 = 0x0c;
    pub const XML_DOCUMENT: u8 = 0x0f;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS: u8 = 0x11;
    pub const UTF_8_EMPTY: u16 = 0x00;
}
