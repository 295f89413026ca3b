//! TypedBytes streaming codec and row processors
//!
//! Layout:
//! - `protocol`: TypedBytes reader/writer, opaque pass-through
//! - `stream`: row decoding, the accumulate/emit loop, grouped reduce
//! - `programs`: colsums, word count and TSQR over Hadoop streaming
//! - `dump`, `mapped`: inspection tooling

pub mod config;
pub mod dump;
pub mod error;
pub mod mapped;
pub mod programs;
pub mod protocol;
pub mod report;
pub mod stream;

pub use error::{Result, TypedBytesError};
pub use protocol::{OpaqueValue, TypeTag, TypedBytesReader, TypedBytesWriter, ValidationMode, Value};
