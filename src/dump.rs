//! Human-readable dump of a TypedBytes stream
//!
//! One line per value, nested values indented two spaces further:
//!
//! ```text
//! TypedBytesList:
//!   TypedBytesDouble: 1.000000
//!   TypedBytesDouble: 2.000000
//! TypedBytesMap: length=1
//!  Key:
//!   TypedBytesString: hi
//!  Value:
//!   TypedBytesInteger: 1
//! ```

use std::io::{Read, Write};

use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypeTag, TypedBytesReader, TypedBytesWriter};

/// Longest string prefix printed before eliding the rest
const STRING_PREVIEW: usize = 10;

/// Byte sequences show at most this many leading bytes
const BYTES_PREVIEW: usize = 8;

/// Dump every value in `reader` to `out`. Returns the number of top-level
/// values.
pub fn dump_all<R: Read, W: Write>(reader: &mut TypedBytesReader<R>, out: &mut W) -> Result<usize> {
    let mut count = 0;
    loop {
        match reader.try_next_tag()? {
            None => break,
            Some(TypeTag::ListEnd) => return Err(TypedBytesError::UnexpectedListEnd),
            Some(tag) => dump_body(reader, tag, out, 0)?,
        }
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Dump one nested value. `false` when the tag was a list terminator.
fn dump_element<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    out: &mut W,
    indent: usize,
) -> Result<bool> {
    match reader.try_next_tag()? {
        None => Err(TypedBytesError::UnexpectedEof {
            context: "nested value",
        }),
        Some(TypeTag::ListEnd) => Ok(false),
        Some(tag) => {
            dump_body(reader, tag, out, indent)?;
            Ok(true)
        }
    }
}

fn dump_required<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    out: &mut W,
    indent: usize,
) -> Result<()> {
    if dump_element(reader, out, indent)? {
        Ok(())
    } else {
        Err(TypedBytesError::UnexpectedListEnd)
    }
}

fn dump_body<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    tag: TypeTag,
    out: &mut W,
    indent: usize,
) -> Result<()> {
    let pad = " ".repeat(indent);
    match tag {
        TypeTag::ByteSequence => {
            let code = reader.last_code();
            let mut cursor = reader.begin_byte_sequence()?;
            if code == TypeTag::ByteSequence.code() {
                write!(out, "{}TypedBytesByteSequence: length={}", pad, cursor.remaining())?;
            } else {
                write!(
                    out,
                    "{}TypedBytesByteSequence({}): length={}",
                    pad,
                    code,
                    cursor.remaining()
                )?;
            }

            let mut head = [0u8; BYTES_PREVIEW];
            let n = cursor.remaining().min(BYTES_PREVIEW);
            cursor = reader.read_chunk(cursor, &mut head[..n])?;
            if n > 0 {
                writeln!(
                    out,
                    " first 8 bytes: {:02x}{:02x}{:02x}{:02x} {:02x}{:02x}{:02x}{:02x}",
                    head[0], head[1], head[2], head[3], head[4], head[5], head[6], head[7]
                )?;
            } else {
                writeln!(out)?;
            }
            let mut rest = Vec::new();
            reader.read_rest(cursor, &mut rest)?;
        }
        TypeTag::Byte => writeln!(out, "{}TypedBytesByte: {}", pad, reader.read_byte()?)?,
        TypeTag::Boolean => writeln!(
            out,
            "{}TypedBytesBoolean: {}",
            pad,
            u8::from(reader.read_bool()?)
        )?,
        TypeTag::Integer => writeln!(out, "{}TypedBytesInteger: {}", pad, reader.read_int()?)?,
        TypeTag::Long => writeln!(out, "{}TypedBytesLong: {}", pad, reader.read_long()?)?,
        TypeTag::Float => writeln!(out, "{}TypedBytesFloat: {:.6}", pad, reader.read_float()?)?,
        TypeTag::Double => writeln!(out, "{}TypedBytesDouble: {:.6}", pad, reader.read_double()?)?,
        TypeTag::String => {
            let mut bytes = Vec::new();
            reader.read_string(&mut bytes)?;
            if bytes.len() > STRING_PREVIEW {
                writeln!(
                    out,
                    "{}TypedBytesString: {}[...]",
                    pad,
                    String::from_utf8_lossy(&bytes[..STRING_PREVIEW])
                )?;
            } else {
                writeln!(out, "{}TypedBytesString: {}", pad, String::from_utf8_lossy(&bytes))?;
            }
        }
        TypeTag::Vector => {
            let len = reader.read_sequence_length()?;
            writeln!(out, "{}TypedBytesVector: length={}", pad, len)?;
            for _ in 0..len {
                dump_required(reader, out, indent + 2)?;
            }
        }
        TypeTag::Map => {
            let len = reader.read_sequence_length()?;
            writeln!(out, "{}TypedBytesMap: length={}", pad, len)?;
            for _ in 0..len {
                writeln!(out, "{} Key:", pad)?;
                dump_required(reader, out, indent + 2)?;
                writeln!(out, "{} Value:", pad)?;
                dump_required(reader, out, indent + 2)?;
            }
        }
        TypeTag::List => {
            writeln!(out, "{}TypedBytesList:", pad)?;
            while dump_element(reader, out, indent + 2)? {}
        }
        TypeTag::ListEnd => return Err(TypedBytesError::UnexpectedListEnd),
        TypeTag::TypeError => return Err(TypedBytesError::IllegalTag(reader.last_code())),
    }
    Ok(())
}

/// Write the reference stream: one or more values of every tag, including
/// nested composites. Used to check readers against a known input.
pub fn write_sample<W: Write>(w: &mut TypedBytesWriter<W>) -> Result<()> {
    w.write_byte_sequence(&0xdead_beef_u32.to_le_bytes())?;
    w.write_byte_sequence(b"abcdefghi\0")?;

    for v in [0, -1, 1] {
        w.write_byte(v)?;
    }
    w.write_bool(false)?;
    w.write_bool(true)?;
    for v in [0, -1, 1] {
        w.write_int(v)?;
    }
    for v in [0, -1, 1] {
        w.write_long(v)?;
    }
    for v in [0.0, -1.0, 1.0, 1.5] {
        w.write_float(v)?;
    }
    for v in [0.0, -1.0, 1.0, 1.5] {
        w.write_double(v)?;
    }
    for s in [&b"hi there"[..], b"hi\nthere", b""] {
        w.write_string(s)?;
    }

    w.write_list_start()?;
    for v in [1.0, 2.0, -0.0] {
        w.write_double(v)?;
    }
    w.write_list_end()?;

    w.write_map_start(2)?;
    w.write_string(b"hi")?;
    w.write_int(1)?;
    w.write_string(b"there")?;
    w.write_int(2)?;

    w.write_vector_start(3)?;
    for s in [&b"All"[..], b"good", b"men"] {
        w.write_string(s)?;
    }

    w.write_vector_start(3)?;
    w.write_bool(false)?;
    w.write_int(5)?;
    w.write_double(std::f64::consts::PI)?;
    w.flush()
}
