//! Word count
//!
//! map: `(integer key, String line)` → `(String word, Int 1)` per word.
//! reduce: `(String word, integer count)` sorted by word → `(String, Long)`.

use std::io::{Read, Write};

use super::{record_key_tag, required_tag};
use crate::config::{Phase, RunConfig};
use crate::error::Result;
use crate::protocol::{TypedBytesReader, TypedBytesWriter};
use crate::report::StatusSink;
use crate::stream::run_grouped_reduce;

/// Words of `line` split on single spaces, empty tokens dropped
pub fn words(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| *b == b' ').filter(|w| !w.is_empty())
}

/// Returns the number of words emitted.
pub fn map<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<u64> {
    let mut line = Vec::new();
    let mut lines = 0u64;
    let mut emitted = 0u64;

    while record_key_tag(reader)?.is_some() {
        reader.convert_long()?;
        required_tag(reader, "line")?;
        reader.read_string(&mut line)?;
        lines += 1;

        for word in words(&line) {
            writer.write_string(word)?;
            writer.write_int(1)?;
            emitted += 1;
        }
    }

    sink.status("final output");
    sink.counter("words", emitted);
    writer.flush()?;
    log::info!("split {} lines into {} words", lines, emitted);
    Ok(emitted)
}

fn decode_count<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Option<(Vec<u8>, i64)>> {
    if record_key_tag(reader)?.is_none() {
        return Ok(None);
    }
    let mut word = Vec::new();
    reader.read_string(&mut word)?;
    required_tag(reader, "word count")?;
    Ok(Some((word, reader.convert_long()?)))
}

#[allow(clippy::ptr_arg)]
fn encode_total<W: Write>(writer: &mut TypedBytesWriter<W>, word: &Vec<u8>, total: &i64) -> Result<()> {
    writer.write_string(word)?;
    writer.write_long(*total)
}

pub fn reduce<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<usize> {
    run_grouped_reduce(reader, writer, sink, decode_count, encode_total)
}

pub fn run<R: Read, W: Write>(
    config: &RunConfig,
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<()> {
    match config.phase {
        Phase::Map => {
            map(reader, writer, sink)?;
        }
        Phase::Reduce => {
            reduce(reader, writer, sink)?;
        }
    }
    Ok(())
}
