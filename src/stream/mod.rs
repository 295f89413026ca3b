//! Streaming row processing on top of the codec
//!
//! Mappers read `(key, row)` pairs, fold rows into an accumulator and emit
//! at the end; reducers merge runs of equal keys.

mod grouped;
mod processor;
mod row;

pub use grouped::{run_grouped_reduce, GroupedReduce};
pub use processor::{
    FlushPolicy, ProcessorState, ProcessorSummary, RowAccumulator, StreamingRowProcessor,
    PROGRESS_INTERVAL,
};
pub use row::RowDecoder;
