//! Opaque pass-through
//!
//! Captures one complete value as its exact wire bytes without interpreting
//! it, so it can be skipped or forwarded unchanged. Tag codes (custom codes
//! included) and length prefixes are copied verbatim.

use std::io::{Read, Write};
use std::mem;

use super::reader::TypedBytesReader;
use super::tag::TypeTag;
use super::writer::TypedBytesWriter;
use crate::error::{Result, TypedBytesError};

/// Self-describing wire encoding of one or more values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueValue {
    bytes: Vec<u8>,
}

impl OpaqueValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap bytes that are already a valid encoding
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drop the contents, keeping the allocation for reuse
    #[inline(always)]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl<R: Read> TypedBytesReader<R> {
    /// Append the next complete value to `buffer`.
    ///
    /// Returns `Ok(false)` if the stream was already exhausted (nothing is
    /// appended). A ListEnd at top level, an illegal code, or truncation
    /// inside the value is an error; the stream position is then undefined.
    pub fn read_opaque(&mut self, buffer: &mut OpaqueValue) -> Result<bool> {
        let Some(code) = self.next_code()? else {
            return Ok(false);
        };
        self.read_opaque_body(code, &mut buffer.bytes, false)?;
        Ok(true)
    }

    /// Read and discard the next value. `Ok(false)` at a clean end of stream.
    pub fn skip_next(&mut self) -> Result<bool> {
        let mut scratch = OpaqueValue::from_bytes(mem::take(&mut self.skip_scratch));
        scratch.clear();
        let result = self.read_opaque(&mut scratch);
        self.skip_scratch = scratch.into_bytes();
        result
    }

    fn read_opaque_element(&mut self, buf: &mut Vec<u8>, inside_list: bool) -> Result<TypeTag> {
        match self.next_code()? {
            Some(code) => self.read_opaque_body(code, buf, inside_list),
            None => Err(TypedBytesError::UnexpectedEof {
                context: "nested value",
            }),
        }
    }

    fn read_opaque_body(&mut self, code: u8, buf: &mut Vec<u8>, inside_list: bool) -> Result<TypeTag> {
        let tag = TypeTag::from_u8(code);
        buf.push(code);
        match tag {
            TypeTag::Byte | TypeTag::Boolean => {
                buf.extend_from_slice(&self.read_array::<1>("opaque payload")?);
            }
            TypeTag::Integer | TypeTag::Float => {
                buf.extend_from_slice(&self.read_array::<4>("opaque payload")?);
            }
            TypeTag::Long | TypeTag::Double => {
                buf.extend_from_slice(&self.read_array::<8>("opaque payload")?);
            }
            TypeTag::String | TypeTag::ByteSequence => {
                let len = self.read_opaque_length(buf)?;
                self.read_into(len, buf, "opaque bytes")?;
            }
            TypeTag::Vector => {
                let len = self.read_opaque_length(buf)?;
                for _ in 0..len {
                    self.read_opaque_element(buf, false)?;
                }
            }
            TypeTag::Map => {
                let len = self.read_opaque_length(buf)?;
                for _ in 0..len {
                    self.read_opaque_element(buf, false)?;
                    self.read_opaque_element(buf, false)?;
                }
            }
            TypeTag::List => {
                while self.read_opaque_element(buf, true)? != TypeTag::ListEnd {}
            }
            TypeTag::ListEnd if inside_list => {}
            TypeTag::ListEnd => return Err(TypedBytesError::UnexpectedListEnd),
            TypeTag::TypeError => return Err(TypedBytesError::IllegalTag(code)),
        }
        Ok(tag)
    }

    /// Copy a length prefix as it appeared on the wire and decode it.
    fn read_opaque_length(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let raw = self.read_array::<4>("opaque length")?;
        buf.extend_from_slice(&raw);
        let len = i32::from_be_bytes(raw);
        usize::try_from(len).map_err(|_| TypedBytesError::NegativeLength(len))
    }
}

impl<W: Write> TypedBytesWriter<W> {
    /// Write a captured value back exactly as it was read.
    pub fn write_opaque(&mut self, value: &OpaqueValue) -> Result<()> {
        self.write_raw(value.as_bytes())
    }
}
