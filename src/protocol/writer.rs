//! Streaming TypedBytes encoder
//!
//! Every write emits the one-byte tag followed by the big-endian payload.
//! Composite starts (`write_vector_start`, `write_map_start`,
//! `write_list_start`) only emit the header; the caller writes the elements.

use std::io::Write;

use super::tag::TypeTag;
use crate::error::{Result, TypedBytesError};

/// TypedBytes writer over a blocking byte sink
pub struct TypedBytesWriter<W: Write> {
    inner: W,
}

impl<W: Write> TypedBytesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Flush buffered output to the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    #[inline(always)]
    fn write_code(&mut self, code: u8) -> Result<()> {
        self.inner.write_all(&[code])?;
        Ok(())
    }

    #[inline(always)]
    fn write_length(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len).map_err(|_| TypedBytesError::LengthOverflow(len))?;
        self.inner.write_all(&len.to_be_bytes())?;
        Ok(())
    }

    fn write_prefixed(&mut self, code: u8, bytes: &[u8]) -> Result<()> {
        // Validate before the tag goes out so a rejected value leaves no trace.
        if i32::try_from(bytes.len()).is_err() {
            return Err(TypedBytesError::LengthOverflow(bytes.len()));
        }
        self.write_code(code)?;
        self.write_length(bytes.len())?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_byte(&mut self, val: i8) -> Result<()> {
        self.write_code(TypeTag::Byte.code())?;
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    pub fn write_bool(&mut self, val: bool) -> Result<()> {
        self.write_code(TypeTag::Boolean.code())?;
        self.inner.write_all(&[u8::from(val)])?;
        Ok(())
    }

    pub fn write_int(&mut self, val: i32) -> Result<()> {
        self.write_code(TypeTag::Integer.code())?;
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    pub fn write_long(&mut self, val: i64) -> Result<()> {
        self.write_code(TypeTag::Long.code())?;
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    /// Bit pattern is written as-is, so NaN payloads survive.
    pub fn write_float(&mut self, val: f32) -> Result<()> {
        self.write_code(TypeTag::Float.code())?;
        self.inner.write_all(&val.to_bits().to_be_bytes())?;
        Ok(())
    }

    pub fn write_double(&mut self, val: f64) -> Result<()> {
        self.write_code(TypeTag::Double.code())?;
        self.inner.write_all(&val.to_bits().to_be_bytes())?;
        Ok(())
    }

    pub fn write_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_prefixed(TypeTag::String.code(), bytes)
    }

    pub fn write_byte_sequence(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_prefixed(TypeTag::ByteSequence.code(), bytes)
    }

    /// Byte payload under an application-defined code (50..=200).
    pub fn write_custom(&mut self, code: u8, bytes: &[u8]) -> Result<()> {
        if !super::tag::is_custom_code(code) {
            return Err(TypedBytesError::IllegalTag(code));
        }
        self.write_prefixed(code, bytes)
    }

    pub fn write_list_start(&mut self) -> Result<()> {
        self.write_code(TypeTag::List.code())
    }

    pub fn write_list_end(&mut self) -> Result<()> {
        self.write_code(TypeTag::ListEnd.code())
    }

    /// Header of a map with `len` pairs; exactly `2 * len` values must follow.
    pub fn write_map_start(&mut self, len: usize) -> Result<()> {
        self.write_code(TypeTag::Map.code())?;
        self.write_length(len)
    }

    /// Header of a vector with `len` elements; exactly `len` values must follow.
    pub fn write_vector_start(&mut self, len: usize) -> Result<()> {
        self.write_code(TypeTag::Vector.code())?;
        self.write_length(len)
    }

    /// Write pre-encoded bytes verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }
}
