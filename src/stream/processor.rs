//! Streaming row processor
//!
//! The loop every mapper/reducer shares:
//!
//! ```text
//!   Init ──first key+row──▶ Accumulating ──key skip at EOF──▶ Draining ──▶ Finished
//!                             │  ▲
//!                             └──┘ skip key, decode row, fold,
//!                                  compact when the flush policy says so
//! ```
//!
//! What folding and compacting mean is up to the [`RowAccumulator`].

use std::io::{Read, Write};

use super::row::RowDecoder;
use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypedBytesReader, TypedBytesWriter};
use crate::report::StatusSink;

/// Rows between `rows processed` counter updates
pub const PROGRESS_INTERVAL: usize = 50_000;

/// Program-specific state folded over the rows of one stream
pub trait RowAccumulator {
    /// Called once, before the first fold, with the width of the first row.
    fn start(&mut self, ncols: usize) -> Result<()>;

    /// Fold one row. Every row has the width passed to `start`.
    fn fold(&mut self, row: &[f64]) -> Result<()>;

    /// Block flush requested by the flush policy.
    fn compact(&mut self) -> Result<()> {
        Ok(())
    }

    /// Emit whatever is left once the input is exhausted.
    fn finish<W: Write>(&mut self, out: &mut TypedBytesWriter<W>) -> Result<()>;
}

/// When the processor asks the accumulator to compact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Never mid-stream; the accumulator only sees `finish`
    #[default]
    EndOfStream,
    /// After every `n` folded rows
    EveryRows(usize),
    /// After `k * ncols` folded rows (a TSQR block of height `k * ncols`)
    RowsPerColumn(usize),
}

impl FlushPolicy {
    /// Rows per compaction for a stream of `ncols` columns
    pub fn threshold(&self, ncols: usize) -> Option<usize> {
        match *self {
            FlushPolicy::EndOfStream => None,
            FlushPolicy::EveryRows(n) => Some(n.max(1)),
            FlushPolicy::RowsPerColumn(k) => Some(k.saturating_mul(ncols).max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Init,
    Accumulating,
    Draining,
    Finished,
}

/// Totals reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorSummary {
    pub rows: usize,
    pub ncols: usize,
    pub compactions: usize,
}

/// Drives key-skip, row decode and fold until the input is exhausted
pub struct StreamingRowProcessor {
    policy: FlushPolicy,
    state: ProcessorState,
    decoder: RowDecoder,
    row: Vec<f64>,
    ncols: usize,
    threshold: Option<usize>,
    pending: usize,
    compactions: usize,
}

impl StreamingRowProcessor {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            state: ProcessorState::Init,
            decoder: RowDecoder::new(),
            row: Vec::new(),
            ncols: 0,
            threshold: None,
            pending: 0,
            compactions: 0,
        }
    }

    #[inline(always)]
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    #[inline(always)]
    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    /// Consume `reader` to the end, folding every row into `acc`, then let
    /// `acc` write its output to `writer`.
    pub fn run<R, W, A>(
        &mut self,
        reader: &mut TypedBytesReader<R>,
        writer: &mut TypedBytesWriter<W>,
        acc: &mut A,
        sink: &mut dyn StatusSink,
    ) -> Result<ProcessorSummary>
    where
        R: Read,
        W: Write,
        A: RowAccumulator,
    {
        loop {
            match self.state {
                ProcessorState::Init => self.first_row(reader, acc, sink)?,
                ProcessorState::Accumulating => self.next_row(reader, acc, sink)?,
                ProcessorState::Draining => {
                    sink.status("final output");
                    if self.decoder.rows_read() > 0 {
                        acc.finish(writer)?;
                    } else {
                        log::warn!("input stream was empty; nothing to emit");
                    }
                    writer.flush()?;
                    self.state = ProcessorState::Finished;
                }
                ProcessorState::Finished => break,
            }
        }

        Ok(ProcessorSummary {
            rows: self.decoder.rows_read(),
            ncols: self.ncols,
            compactions: self.compactions,
        })
    }

    /// Skip one key. `false` means the stream ended cleanly before it.
    fn skip_key<R: Read>(&self, reader: &mut TypedBytesReader<R>) -> Result<bool> {
        reader
            .skip_next()
            .map_err(|source| TypedBytesError::InvalidKey {
                row: self.decoder.rows_read(),
                source: Box::new(source),
            })
    }

    fn first_row<R: Read, A: RowAccumulator>(
        &mut self,
        reader: &mut TypedBytesReader<R>,
        acc: &mut A,
        sink: &mut dyn StatusSink,
    ) -> Result<()> {
        if !self.skip_key(reader)? {
            self.state = ProcessorState::Draining;
            return Ok(());
        }
        self.decoder.read_full_row(reader, &mut self.row)?;
        self.ncols = self.row.len();
        self.threshold = self.policy.threshold(self.ncols);
        match self.threshold {
            Some(rows) => log::info!(
                "matrix size: {} ncols, up to {} local rows",
                self.ncols,
                rows
            ),
            None => log::info!("matrix size: {} ncols", self.ncols),
        }

        acc.start(self.ncols)?;
        self.fold(acc, sink)?;
        self.state = ProcessorState::Accumulating;
        Ok(())
    }

    fn next_row<R: Read, A: RowAccumulator>(
        &mut self,
        reader: &mut TypedBytesReader<R>,
        acc: &mut A,
        sink: &mut dyn StatusSink,
    ) -> Result<()> {
        if !self.skip_key(reader)? {
            self.state = ProcessorState::Draining;
            return Ok(());
        }
        self.decoder.read_full_row(reader, &mut self.row)?;
        if self.row.len() != self.ncols {
            return Err(TypedBytesError::RowWidthMismatch {
                row: self.decoder.rows_read() - 1,
                expected: self.ncols,
                found: self.row.len(),
            });
        }
        self.fold(acc, sink)
    }

    fn fold<A: RowAccumulator>(&mut self, acc: &mut A, sink: &mut dyn StatusSink) -> Result<()> {
        acc.fold(&self.row)?;
        self.pending += 1;

        if self.decoder.rows_read() % PROGRESS_INTERVAL == 0 {
            sink.counter("rows processed", PROGRESS_INTERVAL as u64);
        }

        if let Some(threshold) = self.threshold {
            if self.pending >= threshold {
                acc.compact()?;
                self.pending = 0;
                self.compactions += 1;
                sink.counter("compress", 1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullSink;
    use std::io::Cursor;

    /// Records every call so the control flow can be checked
    #[derive(Default)]
    struct Recorder {
        ncols: Option<usize>,
        rows: Vec<Vec<f64>>,
        compacted_after: Vec<usize>,
        finished: bool,
    }

    impl RowAccumulator for Recorder {
        fn start(&mut self, ncols: usize) -> Result<()> {
            self.ncols = Some(ncols);
            Ok(())
        }

        fn fold(&mut self, row: &[f64]) -> Result<()> {
            self.rows.push(row.to_vec());
            Ok(())
        }

        fn compact(&mut self) -> Result<()> {
            self.compacted_after.push(self.rows.len());
            Ok(())
        }

        fn finish<W: Write>(&mut self, out: &mut TypedBytesWriter<W>) -> Result<()> {
            self.finished = true;
            out.write_long(self.rows.len() as i64)
        }
    }

    fn matrix(rows: &[&[f64]]) -> Vec<u8> {
        let mut w = TypedBytesWriter::new(Vec::new());
        for (i, row) in rows.iter().enumerate() {
            w.write_long(i as i64).unwrap();
            w.write_list_start().unwrap();
            for v in row.iter() {
                w.write_double(*v).unwrap();
            }
            w.write_list_end().unwrap();
        }
        w.into_inner()
    }

    fn run(bytes: Vec<u8>, policy: FlushPolicy, acc: &mut Recorder) -> (Result<ProcessorSummary>, Vec<u8>) {
        let mut reader = TypedBytesReader::new(Cursor::new(bytes));
        let mut writer = TypedBytesWriter::new(Vec::new());
        let mut processor = StreamingRowProcessor::new(policy);
        let result = processor.run(&mut reader, &mut writer, acc, &mut NullSink);
        (result, writer.into_inner())
    }

    #[test]
    fn test_folds_every_row_then_drains() {
        let mut acc = Recorder::default();
        let (summary, out) = run(
            matrix(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]),
            FlushPolicy::EndOfStream,
            &mut acc,
        );
        let summary = summary.unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.ncols, 2);
        assert_eq!(summary.compactions, 0);
        assert_eq!(acc.ncols, Some(2));
        assert_eq!(acc.rows[2], vec![5.0, 6.0]);
        assert!(acc.finished);
        assert_eq!(out, [4, 0, 0, 0, 0, 0, 0, 0, 3]);
    }

    #[test]
    fn test_rows_per_column_policy() {
        let rows: Vec<Vec<f64>> = (0..9).map(|i| vec![i as f64, 1.0]).collect();
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let mut acc = Recorder::default();
        let (summary, _) = run(matrix(&refs), FlushPolicy::RowsPerColumn(2), &mut acc);
        assert_eq!(summary.unwrap().compactions, 2);
        assert_eq!(acc.compacted_after, vec![4, 8]);
    }

    #[test]
    fn test_rows_per_column_threshold_saturates() {
        let policy = FlushPolicy::RowsPerColumn(usize::MAX / 2);
        assert_eq!(policy.threshold(3), Some(usize::MAX));
        let mut acc = Recorder::default();
        let (summary, _) = run(matrix(&[&[1.0, 2.0, 3.0]]), policy, &mut acc);
        assert_eq!(summary.unwrap().compactions, 0);
        assert!(acc.finished);
    }

    #[test]
    fn test_every_rows_policy() {
        let mut acc = Recorder::default();
        let (summary, _) = run(
            matrix(&[&[1.0], &[2.0], &[3.0]]),
            FlushPolicy::EveryRows(1),
            &mut acc,
        );
        assert_eq!(summary.unwrap().compactions, 3);
    }

    #[test]
    fn test_empty_stream_emits_nothing() {
        let mut acc = Recorder::default();
        let (summary, out) = run(Vec::new(), FlushPolicy::EndOfStream, &mut acc);
        assert_eq!(summary.unwrap(), ProcessorSummary::default());
        assert!(!acc.finished);
        assert!(out.is_empty());
    }

    #[test]
    fn test_width_mismatch_is_fatal() {
        let mut acc = Recorder::default();
        let (summary, _) = run(
            matrix(&[&[1.0, 2.0], &[3.0]]),
            FlushPolicy::EndOfStream,
            &mut acc,
        );
        assert!(matches!(
            summary,
            Err(TypedBytesError::RowWidthMismatch {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_bad_key_is_fatal() {
        let mut bytes = matrix(&[&[1.0]]);
        bytes.push(33);
        let mut acc = Recorder::default();
        let (summary, _) = run(bytes, FlushPolicy::EndOfStream, &mut acc);
        match summary {
            Err(TypedBytesError::InvalidKey { row: 1, source }) => {
                assert!(matches!(*source, TypedBytesError::IllegalTag(33)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!acc.finished);
    }

    #[test]
    fn test_key_without_row_is_fatal() {
        let mut bytes = matrix(&[&[1.0]]);
        bytes.extend_from_slice(&[3, 0, 0, 0, 1]);
        let mut acc = Recorder::default();
        let (summary, _) = run(bytes, FlushPolicy::EndOfStream, &mut acc);
        assert!(matches!(
            summary,
            Err(TypedBytesError::UnexpectedEof { .. })
        ));
    }
}
