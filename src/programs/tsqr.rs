//! Tall-skinny block reduction
//!
//! The mapper buffers rows into a column-major block of `block_size * ncols`
//! rows and hands every full block to a [`BlockReduction`]. At end of input
//! the partial result is emitted under a random key so reducers receive an
//! even spread.
//!
//! The shipped reduction is the sum of squares of every entry (the squared
//! Frobenius norm). Partials from several mappers combine by addition, which
//! is what the reduce phase does.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{record_key_tag, required_tag};
use crate::config::{Phase, RunConfig};
use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypedBytesReader, TypedBytesWriter};
use crate::report::StatusSink;
use crate::stream::{FlushPolicy, ProcessorSummary, RowAccumulator, StreamingRowProcessor};

/// Largest random output key
pub const MAX_KEY: i64 = 4_000_000_000;

/// Most `f64` entries a single block may hold
pub const MAX_BLOCK_ENTRIES: usize = 1 << 28;

/// Compression step applied to each full block
pub trait BlockReduction {
    /// Fold the first `nrows` rows of a column-major block whose columns
    /// are `ld` entries apart.
    fn reduce_block(&mut self, block: &[f64], ld: usize, nrows: usize, ncols: usize) -> Result<()>;

    /// Combine a partial result produced by another instance.
    fn merge_partial(&mut self, partial: f64) -> Result<()>;

    fn total(&self) -> f64;
}

/// Sum of squared entries
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SumOfSquares {
    total: f64,
}

impl BlockReduction for SumOfSquares {
    fn reduce_block(&mut self, block: &[f64], ld: usize, nrows: usize, ncols: usize) -> Result<()> {
        let needed = ld.checked_mul(ncols);
        if nrows > ld || needed.map_or(true, |n| block.len() < n) {
            return Err(TypedBytesError::Reduction(format!(
                "block of {} entries cannot hold {} x {} with leading dimension {}",
                block.len(),
                nrows,
                ncols,
                ld
            )));
        }
        if ld == 0 {
            return Ok(());
        }
        for column in block.chunks_exact(ld).take(ncols) {
            self.total += column[..nrows].iter().map(|v| v * v).sum::<f64>();
        }
        Ok(())
    }

    fn merge_partial(&mut self, partial: f64) -> Result<()> {
        self.total += partial;
        Ok(())
    }

    #[inline(always)]
    fn total(&self) -> f64 {
        self.total
    }
}

/// Row buffer feeding a [`BlockReduction`]
pub struct BlockAccumulator<B: BlockReduction> {
    block_size: usize,
    block: Vec<f64>,
    nrows: usize,
    ncols: usize,
    currows: usize,
    reduction: B,
    rng: StdRng,
}

impl<B: BlockReduction> BlockAccumulator<B> {
    pub fn new(block_size: usize, reduction: B, rng: StdRng) -> Self {
        Self {
            block_size: block_size.max(1),
            block: Vec::new(),
            nrows: 0,
            ncols: 0,
            currows: 0,
            reduction,
            rng,
        }
    }

    /// Rows per block once the column count is known
    #[inline(always)]
    pub fn block_rows(&self) -> usize {
        self.nrows
    }

    pub fn reduction(&self) -> &B {
        &self.reduction
    }

    fn next_key(&mut self) -> i64 {
        self.rng.gen_range(0..=MAX_KEY)
    }
}

impl<B: BlockReduction> RowAccumulator for BlockAccumulator<B> {
    fn start(&mut self, ncols: usize) -> Result<()> {
        let nrows = self.block_size.checked_mul(ncols).map(|n| n.max(1));
        let entries = nrows
            .and_then(|n| n.checked_mul(ncols))
            .filter(|&n| n <= MAX_BLOCK_ENTRIES);
        let (Some(nrows), Some(entries)) = (nrows, entries) else {
            return Err(TypedBytesError::Reduction(format!(
                "block of {} rows per column over {} columns exceeds {} entries",
                self.block_size, ncols, MAX_BLOCK_ENTRIES
            )));
        };
        self.ncols = ncols;
        self.nrows = nrows;
        self.block = vec![0.0; entries];
        self.currows = 0;
        Ok(())
    }

    fn fold(&mut self, row: &[f64]) -> Result<()> {
        if self.currows == self.nrows {
            self.compact()?;
        }
        // store by column
        for (j, v) in row.iter().enumerate() {
            self.block[self.currows + j * self.nrows] = *v;
        }
        self.currows += 1;
        Ok(())
    }

    fn compact(&mut self) -> Result<()> {
        self.reduction
            .reduce_block(&self.block, self.nrows, self.currows, self.ncols)?;
        self.currows = 0;
        Ok(())
    }

    fn finish<W: Write>(&mut self, out: &mut TypedBytesWriter<W>) -> Result<()> {
        self.compact()?;
        let key = self.next_key();
        out.write_long(key)?;
        out.write_double(self.reduction.total())
    }
}

/// Random key source: seeded when asked, entropy otherwise
pub fn key_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn map<R: Read, W: Write>(
    config: &RunConfig,
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<ProcessorSummary> {
    let mut acc = BlockAccumulator::new(config.block_size, SumOfSquares::default(), key_rng(config.seed));
    StreamingRowProcessor::new(FlushPolicy::RowsPerColumn(config.block_size)).run(
        reader,
        writer,
        &mut acc,
        sink,
    )
}

/// Merge `(key, partial)` records into one `(Long key, Double total)`.
/// Returns the number of partials merged.
pub fn reduce<R: Read, W: Write>(
    config: &RunConfig,
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<usize> {
    let mut reduction = SumOfSquares::default();
    let mut partials = 0usize;

    while record_key_tag(reader)?.is_some() {
        reader.convert_long()?;
        required_tag(reader, "partial result")?;
        reduction.merge_partial(reader.convert_double()?)?;
        partials += 1;
    }

    sink.status("final output");
    if partials > 0 {
        let key = key_rng(config.seed).gen_range(0..=MAX_KEY);
        writer.write_long(key)?;
        writer.write_double(reduction.total())?;
    }
    writer.flush()?;
    log::info!("merged {} partial results", partials);
    Ok(partials)
}

pub fn run<R: Read, W: Write>(
    config: &RunConfig,
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<()> {
    match config.phase {
        Phase::Map => {
            let summary = map(config, reader, writer, sink)?;
            log::info!(
                "reduced {} rows of {} columns in {} block compressions",
                summary.rows,
                summary.ncols,
                summary.compactions
            );
        }
        Phase::Reduce => {
            reduce(config, reader, writer, sink)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullSink;
    use std::io::Cursor;

    fn matrix(rows: &[Vec<f64>]) -> Vec<u8> {
        let mut w = TypedBytesWriter::new(Vec::new());
        for (i, row) in rows.iter().enumerate() {
            w.write_long(i as i64).unwrap();
            w.write_vector_start(row.len()).unwrap();
            for v in row {
                w.write_double(*v).unwrap();
            }
        }
        w.into_inner()
    }

    fn key_and_total(bytes: Vec<u8>) -> (i64, f64) {
        let mut r = TypedBytesReader::new(Cursor::new(bytes));
        r.next_tag().unwrap();
        let key = r.read_long().unwrap();
        r.next_tag().unwrap();
        let total = r.read_double().unwrap();
        assert!(r.try_next_tag().unwrap().is_none());
        (key, total)
    }

    fn seeded(seed: u64, block_size: usize) -> RunConfig {
        RunConfig {
            seed: Some(seed),
            block_size,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_sum_of_squares_respects_leading_dimension() {
        let mut r = SumOfSquares::default();
        // 2 live rows of a 3-row block, 2 columns; the third row is stale
        let block = [1.0, 2.0, 100.0, 3.0, 4.0, 100.0];
        r.reduce_block(&block, 3, 2, 2).unwrap();
        assert_eq!(r.total(), 30.0);
    }

    #[test]
    fn test_sum_of_squares_rejects_short_block() {
        let mut r = SumOfSquares::default();
        assert!(matches!(
            r.reduce_block(&[1.0, 2.0], 2, 2, 2),
            Err(TypedBytesError::Reduction(_))
        ));
    }

    #[test]
    fn test_map_total_independent_of_block_size() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 1.0, -2.0]).collect();
        let expected: f64 = rows.iter().flatten().map(|v| v * v).sum();

        for block_size in [1, 2, 3, 7] {
            let config = seeded(11, block_size);
            let mut reader = TypedBytesReader::new(Cursor::new(matrix(&rows)));
            let mut writer = TypedBytesWriter::new(Vec::new());
            let summary = map(&config, &mut reader, &mut writer, &mut NullSink).unwrap();
            assert_eq!(summary.rows, 10);
            assert_eq!(summary.compactions, 10 / (block_size * 3));

            let (key, total) = key_and_total(writer.into_inner());
            assert!((0..=MAX_KEY).contains(&key));
            assert_eq!(total, expected);
        }
    }

    #[test]
    fn test_seeded_keys_repeat() {
        let rows = vec![vec![1.0, 2.0]];
        let run_once = || {
            let mut reader = TypedBytesReader::new(Cursor::new(matrix(&rows)));
            let mut writer = TypedBytesWriter::new(Vec::new());
            map(&seeded(42, 3), &mut reader, &mut writer, &mut NullSink).unwrap();
            key_and_total(writer.into_inner())
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn test_block_layout_is_column_major() {
        let mut acc = BlockAccumulator::new(1, SumOfSquares::default(), key_rng(Some(0)));
        acc.start(2).unwrap();
        assert_eq!(acc.block_rows(), 2);
        acc.fold(&[1.0, 2.0]).unwrap();
        acc.fold(&[3.0, 4.0]).unwrap();
        assert_eq!(acc.block, vec![1.0, 3.0, 2.0, 4.0]);
        // a third row forces the full block out first
        acc.fold(&[0.5, 0.5]).unwrap();
        assert_eq!(acc.reduction().total(), 30.0);
        assert_eq!(acc.currows, 1);
    }

    #[test]
    fn test_oversized_block_size_is_an_error() {
        let mut reader = TypedBytesReader::new(Cursor::new(matrix(&[vec![1.0, 2.0]])));
        let mut writer = TypedBytesWriter::new(Vec::new());
        assert!(matches!(
            map(&seeded(1, usize::MAX / 2), &mut reader, &mut writer, &mut NullSink),
            Err(TypedBytesError::Reduction(_))
        ));
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_block_entry_cap() {
        let mut acc = BlockAccumulator::new(1 << 14, SumOfSquares::default(), key_rng(Some(0)));
        // 2^14 * 2^8 rows of 2^8 columns is 2^30 entries
        assert!(matches!(acc.start(1 << 8), Err(TypedBytesError::Reduction(_))));
        acc.start(4).unwrap();
        assert_eq!(acc.block_rows(), 1 << 16);
    }

    #[test]
    fn test_reduce_merges_partials() {
        let mut input = TypedBytesWriter::new(Vec::new());
        for (key, partial) in [(17i64, 1.5), (3, 2.5), (99, 6.0)] {
            input.write_long(key).unwrap();
            input.write_double(partial).unwrap();
        }
        let mut reader = TypedBytesReader::new(Cursor::new(input.into_inner()));
        let mut writer = TypedBytesWriter::new(Vec::new());

        let merged = reduce(&seeded(5, 3), &mut reader, &mut writer, &mut NullSink).unwrap();
        assert_eq!(merged, 3);
        assert_eq!(key_and_total(writer.into_inner()).1, 10.0);
    }

    #[test]
    fn test_reduce_on_empty_input_emits_nothing() {
        let mut reader = TypedBytesReader::new(Cursor::new(Vec::new()));
        let mut writer = TypedBytesWriter::new(Vec::new());
        assert_eq!(
            reduce(&seeded(5, 3), &mut reader, &mut writer, &mut NullSink).unwrap(),
            0
        );
        assert!(writer.into_inner().is_empty());
    }
}
