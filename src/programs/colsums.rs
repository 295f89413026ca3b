//! Column sums
//!
//! map: `(key, row)` → `(Int j, Double sum of column j)` for every column.
//! reduce: `(Int j, Double partial)` sorted by `j` → `(Int j, Double total)`.

use std::io::{Read, Write};

use super::{record_key_tag, required_tag};
use crate::config::{Phase, RunConfig};
use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypedBytesReader, TypedBytesWriter};
use crate::report::StatusSink;
use crate::stream::{
    run_grouped_reduce, FlushPolicy, ProcessorSummary, RowAccumulator, StreamingRowProcessor,
};

/// Per-column running sums
#[derive(Debug, Default)]
pub struct ColumnSums {
    sums: Vec<f64>,
}

impl ColumnSums {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sums(&self) -> &[f64] {
        &self.sums
    }
}

impl RowAccumulator for ColumnSums {
    fn start(&mut self, ncols: usize) -> Result<()> {
        self.sums = vec![0.0; ncols];
        Ok(())
    }

    fn fold(&mut self, row: &[f64]) -> Result<()> {
        for (sum, v) in self.sums.iter_mut().zip(row) {
            *sum += v;
        }
        Ok(())
    }

    fn finish<W: Write>(&mut self, out: &mut TypedBytesWriter<W>) -> Result<()> {
        for (j, sum) in self.sums.iter().enumerate() {
            let col = i32::try_from(j).map_err(|_| TypedBytesError::LengthOverflow(j))?;
            out.write_int(col)?;
            out.write_double(*sum)?;
        }
        Ok(())
    }
}

pub fn map<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<ProcessorSummary> {
    let mut sums = ColumnSums::new();
    StreamingRowProcessor::new(FlushPolicy::EndOfStream).run(reader, writer, &mut sums, sink)
}

fn decode_partial<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Option<(i32, f64)>> {
    if record_key_tag(reader)?.is_none() {
        return Ok(None);
    }
    let col = reader.convert_int()?;
    required_tag(reader, "column sum")?;
    Ok(Some((col, reader.convert_double()?)))
}

fn encode_total<W: Write>(writer: &mut TypedBytesWriter<W>, col: &i32, total: &f64) -> Result<()> {
    writer.write_int(*col)?;
    writer.write_double(*total)
}

pub fn reduce<R: Read, W: Write>(
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<usize> {
    run_grouped_reduce(reader, writer, sink, decode_partial, encode_total)
}

pub fn run<R: Read, W: Write>(
    config: &RunConfig,
    reader: &mut TypedBytesReader<R>,
    writer: &mut TypedBytesWriter<W>,
    sink: &mut dyn StatusSink,
) -> Result<()> {
    match config.phase {
        Phase::Map => {
            let summary = map(reader, writer, sink)?;
            log::info!("summed {} rows of {} columns", summary.rows, summary.ncols);
        }
        Phase::Reduce => {
            reduce(reader, writer, sink)?;
        }
    }
    Ok(())
}
