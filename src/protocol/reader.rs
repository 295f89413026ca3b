//! Streaming TypedBytes decoder
//!
//! Reads one value at a time from any `Read`. The reader remembers the last
//! tag it consumed so primitive reads can be checked against it, and hands
//! out a [`FieldCursor`] for strings and byte sequences so they can be read
//! in chunks smaller than their declared length.

use std::io::{self, Read};

use super::tag::TypeTag;
use crate::error::{Result, TypedBytesError};

/// How strictly primitive reads are checked against the last tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Reading a primitive other than the last tag is an error
    #[default]
    Strict,
    /// Trust the caller; payloads are read as requested
    Permissive,
}

/// Position inside one String or ByteSequence payload.
///
/// Returned by [`TypedBytesReader::begin_string`] and
/// [`TypedBytesReader::begin_byte_sequence`], and by every
/// [`TypedBytesReader::read_chunk`] call with the count decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCursor {
    tag: TypeTag,
    remaining: usize,
    field: u64,
}

impl FieldCursor {
    /// Bytes not yet read from the field
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// `String` or `ByteSequence`
    #[inline(always)]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

/// TypedBytes reader over a blocking byte stream
pub struct TypedBytesReader<R> {
    inner: R,
    mode: ValidationMode,
    last_code: u8,
    last_tag: TypeTag,
    // Bumped on every read other than a chunk read; cursors carry the
    // value they were issued under.
    field: u64,
    eof: bool,
    // Reused by `skip_next` so skipping keys does not allocate per value.
    pub(super) skip_scratch: Vec<u8>,
}

impl<R: Read> TypedBytesReader<R> {
    /// Reader in [`ValidationMode::Strict`]
    pub fn new(inner: R) -> Self {
        Self::with_mode(inner, ValidationMode::Strict)
    }

    pub fn with_mode(inner: R, mode: ValidationMode) -> Self {
        Self {
            inner,
            mode,
            last_code: TypeTag::TypeError.code(),
            last_tag: TypeTag::TypeError,
            field: 0,
            eof: false,
            skip_scratch: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Tag of the most recently consumed type code
    #[inline(always)]
    pub fn last_tag(&self) -> TypeTag {
        self.last_tag
    }

    /// Raw most recently consumed type code (custom codes are not collapsed)
    #[inline(always)]
    pub fn last_code(&self) -> u8 {
        self.last_code
    }

    /// True once a type-code read hit the end of the stream
    #[inline(always)]
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Consume one type code. `None` when the stream is exhausted.
    pub(crate) fn next_code(&mut self) -> Result<Option<u8>> {
        self.field = self.field.wrapping_add(1);
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.eof = true;
                    self.last_code = TypeTag::TypeError.code();
                    self.last_tag = TypeTag::TypeError;
                    return Ok(None);
                }
                Ok(_) => {
                    self.last_code = byte[0];
                    self.last_tag = TypeTag::from_u8(byte[0]);
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Consume exactly one byte and classify it.
    ///
    /// Returns `TypeTag::TypeError` both for an unmapped code and at end of
    /// stream; use [`at_eof`](Self::at_eof) to tell them apart, or call
    /// [`try_next_tag`](Self::try_next_tag).
    pub fn next_tag(&mut self) -> Result<TypeTag> {
        Ok(match self.next_code()? {
            Some(code) => TypeTag::from_u8(code),
            None => TypeTag::TypeError,
        })
    }

    /// Like [`next_tag`](Self::next_tag) but `Ok(None)` at a clean end of
    /// stream and `Err(IllegalTag)` for an unmapped code.
    pub fn try_next_tag(&mut self) -> Result<Option<TypeTag>> {
        match self.next_code()? {
            None => Ok(None),
            Some(code) => match TypeTag::from_u8(code) {
                TypeTag::TypeError => Err(TypedBytesError::IllegalTag(code)),
                tag => Ok(Some(tag)),
            },
        }
    }

    #[inline(always)]
    fn check(&self, expected: TypeTag) -> Result<()> {
        if self.mode == ValidationMode::Strict && self.last_tag != expected {
            return Err(TypedBytesError::TagMismatch {
                expected,
                found: self.last_tag,
            });
        }
        Ok(())
    }

    /// Read `N` payload bytes belonging to the current value.
    pub(crate) fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        self.field = self.field.wrapping_add(1);
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| TypedBytesError::from_read(e, context))?;
        Ok(buf)
    }

    /// Append `len` payload bytes to `out`.
    pub(crate) fn read_into(
        &mut self,
        len: usize,
        out: &mut Vec<u8>,
        context: &'static str,
    ) -> Result<()> {
        self.field = self.field.wrapping_add(1);
        let read = (&mut self.inner)
            .take(len as u64)
            .read_to_end(out)
            .map_err(|e| TypedBytesError::from_read(e, context))?;
        if read < len {
            return Err(TypedBytesError::UnexpectedEof { context });
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        self.check(TypeTag::Byte)?;
        Ok(i8::from_be_bytes(self.read_array("byte payload")?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.check(TypeTag::Boolean)?;
        let [b] = self.read_array::<1>("boolean payload")?;
        Ok(b != 0)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.check(TypeTag::Integer)?;
        Ok(i32::from_be_bytes(self.read_array("integer payload")?))
    }

    pub fn read_long(&mut self) -> Result<i64> {
        self.check(TypeTag::Long)?;
        Ok(i64::from_be_bytes(self.read_array("long payload")?))
    }

    pub fn read_float(&mut self) -> Result<f32> {
        self.check(TypeTag::Float)?;
        Ok(f32::from_bits(u32::from_be_bytes(
            self.read_array("float payload")?,
        )))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        self.check(TypeTag::Double)?;
        Ok(f64::from_bits(u64::from_be_bytes(
            self.read_array("double payload")?,
        )))
    }

    /// Read a 4-byte big-endian length prefix. Negative prefixes are rejected.
    pub fn read_length(&mut self) -> Result<usize> {
        let len = i32::from_be_bytes(self.read_array("length prefix")?);
        usize::try_from(len).map_err(|_| TypedBytesError::NegativeLength(len))
    }

    /// Element count of the Vector or Map whose tag was just read.
    /// A Map of `n` holds `n` key/value pairs.
    pub fn read_sequence_length(&mut self) -> Result<usize> {
        if self.mode == ValidationMode::Strict
            && !matches!(self.last_tag, TypeTag::Vector | TypeTag::Map)
        {
            return Err(TypedBytesError::TagMismatch {
                expected: TypeTag::Vector,
                found: self.last_tag,
            });
        }
        self.read_length()
    }

    /// Read the length prefix of a String and open it for chunked reads.
    pub fn begin_string(&mut self) -> Result<FieldCursor> {
        self.check(TypeTag::String)?;
        self.begin_field(TypeTag::String)
    }

    /// Read the length prefix of a ByteSequence (or custom type) and open
    /// it for chunked reads.
    pub fn begin_byte_sequence(&mut self) -> Result<FieldCursor> {
        self.check(TypeTag::ByteSequence)?;
        self.begin_field(TypeTag::ByteSequence)
    }

    fn begin_field(&mut self, tag: TypeTag) -> Result<FieldCursor> {
        let remaining = self.read_length()?;
        Ok(FieldCursor {
            tag,
            remaining,
            field: self.field,
        })
    }

    /// Fill `buf` from the open field and return the advanced cursor.
    ///
    /// Asking for more than `cursor.remaining()` fails before any byte is
    /// consumed, so the next value in the stream stays intact.
    pub fn read_chunk(&mut self, cursor: FieldCursor, buf: &mut [u8]) -> Result<FieldCursor> {
        if cursor.field != self.field {
            return Err(TypedBytesError::StaleCursor);
        }
        if buf.len() > cursor.remaining {
            return Err(TypedBytesError::ChunkOverrun {
                requested: buf.len(),
                remaining: cursor.remaining,
            });
        }
        self.inner
            .read_exact(buf)
            .map_err(|e| TypedBytesError::from_read(e, "string data"))?;
        Ok(FieldCursor {
            remaining: cursor.remaining - buf.len(),
            ..cursor
        })
    }

    /// Read the rest of an open field into `out` (replacing its contents).
    pub fn read_rest(&mut self, cursor: FieldCursor, out: &mut Vec<u8>) -> Result<()> {
        if cursor.field != self.field {
            return Err(TypedBytesError::StaleCursor);
        }
        out.clear();
        self.read_into(cursor.remaining, out, "string data")
    }

    /// Read a whole String whose tag was just consumed.
    pub fn read_string(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let cursor = self.begin_string()?;
        self.read_rest(cursor, out)
    }

    /// Read a whole ByteSequence whose tag was just consumed.
    pub fn read_byte_sequence(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let cursor = self.begin_byte_sequence()?;
        self.read_rest(cursor, out)
    }

    /// Whether `tag` can be widened to a double.
    #[inline(always)]
    pub fn can_be_double(&self, tag: TypeTag) -> bool {
        tag.can_be_double()
    }

    /// Read a Byte, Boolean or Integer as `i32`.
    pub fn convert_int(&mut self) -> Result<i32> {
        self.convert_int_for("int")
    }

    fn convert_int_for(&mut self, target: &'static str) -> Result<i32> {
        match self.last_tag {
            TypeTag::Byte => Ok(i32::from(self.read_byte()?)),
            TypeTag::Boolean => Ok(i32::from(self.read_bool()?)),
            TypeTag::Integer => self.read_int(),
            tag => Err(TypedBytesError::NotConvertible { tag, target }),
        }
    }

    /// Read a Byte, Boolean, Integer or Long as `i64`.
    pub fn convert_long(&mut self) -> Result<i64> {
        self.convert_long_for("long")
    }

    fn convert_long_for(&mut self, target: &'static str) -> Result<i64> {
        match self.last_tag {
            TypeTag::Long => self.read_long(),
            _ => Ok(i64::from(self.convert_int_for(target)?)),
        }
    }

    /// Read any numeric primitive as `f64`.
    pub fn convert_double(&mut self) -> Result<f64> {
        match self.last_tag {
            TypeTag::Float => Ok(f64::from(self.read_float()?)),
            TypeTag::Double => self.read_double(),
            _ => Ok(self.convert_long_for("double")? as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> TypedBytesReader<Cursor<Vec<u8>>> {
        TypedBytesReader::new(Cursor::new(bytes.to_vec()))
    }

    fn string_record(s: &[u8]) -> Vec<u8> {
        let mut buf = vec![TypeTag::String.code()];
        buf.extend_from_slice(&(s.len() as i32).to_be_bytes());
        buf.extend_from_slice(s);
        buf
    }

    #[test]
    fn test_read_int_big_endian() {
        let mut r = reader(&[3, 0, 0, 0, 1]);
        assert_eq!(r.next_tag().unwrap(), TypeTag::Integer);
        assert_eq!(r.read_int().unwrap(), 1);
    }

    #[test]
    fn test_eof_returns_type_error() {
        let mut r = reader(&[]);
        assert_eq!(r.next_tag().unwrap(), TypeTag::TypeError);
        assert!(r.at_eof());

        let mut r = reader(&[]);
        assert_eq!(r.try_next_tag().unwrap(), None);
    }

    #[test]
    fn test_illegal_code_is_not_eof() {
        let mut r = reader(&[42]);
        assert_eq!(r.next_tag().unwrap(), TypeTag::TypeError);
        assert!(!r.at_eof());

        let mut r = reader(&[254]);
        assert!(matches!(
            r.try_next_tag(),
            Err(TypedBytesError::IllegalTag(254))
        ));
    }

    #[test]
    fn test_strict_mode_rejects_mismatch() {
        let mut r = reader(&[3, 0, 0, 0, 1]);
        r.next_tag().unwrap();
        assert!(matches!(
            r.read_long(),
            Err(TypedBytesError::TagMismatch {
                expected: TypeTag::Long,
                found: TypeTag::Integer
            })
        ));
    }

    #[test]
    fn test_permissive_mode_skips_check() {
        let mut r =
            TypedBytesReader::with_mode(Cursor::new(vec![1, 0xff]), ValidationMode::Permissive);
        r.next_tag().unwrap();
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_chunked_string_matches_whole_read() {
        let mut bytes = string_record(b"abcdefghij");
        bytes.extend_from_slice(&[3, 0, 0, 0, 7]);

        let mut r = reader(&bytes);
        r.next_tag().unwrap();
        let cursor = r.begin_string().unwrap();
        assert_eq!(cursor.remaining(), 10);

        let mut first = [0u8; 4];
        let mut second = [0u8; 6];
        let cursor = r.read_chunk(cursor, &mut first).unwrap();
        assert_eq!(cursor.remaining(), 6);
        let cursor = r.read_chunk(cursor, &mut second).unwrap();
        assert!(cursor.is_done());
        assert_eq!([&first[..], &second[..]].concat(), b"abcdefghij");

        let mut whole = Vec::new();
        let mut r2 = reader(&bytes);
        r2.next_tag().unwrap();
        r2.read_string(&mut whole).unwrap();
        assert_eq!(whole, b"abcdefghij");
    }

    #[test]
    fn test_chunk_overrun_does_not_consume() {
        let mut bytes = string_record(b"abcdefghij");
        bytes.extend_from_slice(&[3, 0, 0, 0, 7]);

        let mut r = reader(&bytes);
        r.next_tag().unwrap();
        let cursor = r.begin_string().unwrap();
        let mut too_big = [0u8; 11];
        assert!(matches!(
            r.read_chunk(cursor, &mut too_big),
            Err(TypedBytesError::ChunkOverrun {
                requested: 11,
                remaining: 10
            })
        ));

        // the declared ten bytes and the next record are still there
        let mut exact = [0u8; 10];
        r.read_chunk(cursor, &mut exact).unwrap();
        assert_eq!(&exact, b"abcdefghij");
        assert_eq!(r.next_tag().unwrap(), TypeTag::Integer);
        assert_eq!(r.read_int().unwrap(), 7);
    }

    #[test]
    fn test_cursor_goes_stale_after_next_tag() {
        let mut bytes = string_record(b"ab");
        bytes.extend_from_slice(&string_record(b"cd"));

        let mut r = reader(&bytes);
        r.next_tag().unwrap();
        let old = r.begin_string().unwrap();
        let mut two = [0u8; 2];
        r.read_chunk(old, &mut two).unwrap();
        r.next_tag().unwrap();
        assert!(matches!(
            r.read_chunk(old, &mut two),
            Err(TypedBytesError::StaleCursor)
        ));
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut r = reader(&[7, 0xff, 0xff, 0xff, 0xfe]);
        r.next_tag().unwrap();
        assert!(matches!(
            r.begin_string(),
            Err(TypedBytesError::NegativeLength(-2))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut r = reader(&[6, 0, 0, 0]);
        r.next_tag().unwrap();
        assert!(matches!(
            r.read_double(),
            Err(TypedBytesError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_convert_widening() {
        let bytes = [
            1, 0xfe, // Byte(-2)
            2, 1, // Boolean(true)
            4, 0, 0, 0, 0, 0, 0, 0, 9, // Long(9)
            5, 0x3f, 0xc0, 0, 0, // Float(1.5)
        ];
        let mut r = reader(&bytes);
        r.next_tag().unwrap();
        assert_eq!(r.convert_double().unwrap(), -2.0);
        r.next_tag().unwrap();
        assert_eq!(r.convert_int().unwrap(), 1);
        r.next_tag().unwrap();
        assert_eq!(r.convert_long().unwrap(), 9);
        r.next_tag().unwrap();
        assert_eq!(r.convert_double().unwrap(), 1.5);
    }

    #[test]
    fn test_convert_rejects_non_numeric() {
        let mut r = reader(&string_record(b"x"));
        r.next_tag().unwrap();
        assert!(matches!(
            r.convert_double(),
            Err(TypedBytesError::NotConvertible {
                tag: TypeTag::String,
                target: "double"
            })
        ));
    }

    #[test]
    fn test_long_does_not_narrow_to_int() {
        let mut r = reader(&[4, 0, 0, 0, 0, 0, 0, 0, 1]);
        r.next_tag().unwrap();
        assert!(matches!(
            r.convert_int(),
            Err(TypedBytesError::NotConvertible { .. })
        ));
    }
}
