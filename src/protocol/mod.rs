//! Protocol layer: the TypedBytes wire format
//!
//! - One tag byte, then a big-endian payload
//! - Strings, byte sequences, vectors and maps are length-prefixed
//! - Lists are closed by a terminator tag
//! - Values can be captured opaquely and forwarded byte-for-byte

mod opaque;
mod reader;
mod tag;
mod value;
mod writer;

pub use opaque::OpaqueValue;
pub use reader::{FieldCursor, TypedBytesReader, ValidationMode};
pub use tag::{is_custom_code, TypeTag, CUSTOM_CODE_MAX, CUSTOM_CODE_MIN};
pub use value::Value;
pub use writer::TypedBytesWriter;
