//! Grouped reduce
//!
//! Reducer input arrives sorted by key. Consecutive records with equal keys
//! are summed; a group is emitted as soon as the key changes, and the last
//! group when the input runs out.

use std::io::{Read, Write};
use std::ops::AddAssign;

use crate::error::Result;
use crate::protocol::{TypedBytesReader, TypedBytesWriter};
use crate::report::StatusSink;

/// Running total of the current key
#[derive(Debug)]
pub struct GroupedReduce<K, T> {
    current: Option<(K, T)>,
}

impl<K, T> Default for GroupedReduce<K, T> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<K: PartialEq, T: AddAssign> GroupedReduce<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Returns the previous group when `key` starts a new one.
    pub fn push(&mut self, key: K, value: T) -> Option<(K, T)> {
        match self.current.as_mut() {
            Some((current, total)) if *current == key => {
                *total += value;
                None
            }
            _ => self.current.replace((key, value)),
        }
    }

    /// Take the group still open at end of input
    pub fn finish(&mut self) -> Option<(K, T)> {
        self.current.take()
    }
}

/// Drive a [`GroupedReduce`] over `reader` until end of stream.
///
/// `decode` returns `Ok(None)` at a clean end of stream. `encode` writes one
/// completed group. Returns the number of groups written.
pub fn run_grouped_reduce<R, W, K, T, D, E>(
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
    mut decode: D,
    mut encode: E,
) -> Result<usize>
where
    R: Read,
    W: Write,
    K: PartialEq,
    T: AddAssign,
    D: FnMut(&mut TypedBytesReader<R>) -> Result<Option<(K, T)>>,
    E: FnMut(&mut TypedBytesWriter<W>, &K, &T) -> Result<()>,
{
    let mut groups = GroupedReduce::new();
    let mut records = 0usize;
    let mut emitted = 0usize;

    while let Some((key, value)) = decode(reader)? {
        records += 1;
        if let Some((done, total)) = groups.push(key, value) {
            encode(writer, &done, &total)?;
            emitted += 1;
        }
    }

    sink.status("final output");
    if let Some((done, total)) = groups.finish() {
        encode(writer, &done, &total)?;
        emitted += 1;
    }
    writer.flush()?;

    log::info!("reduced {} records into {} groups", records, emitted);
    Ok(emitted)
}
