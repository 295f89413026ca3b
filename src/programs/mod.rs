//! Hadoop streaming programs
//!
//! Each program exposes `run`, which works on any reader/writer pair, and
//! the binaries hand it stdin/stdout through [`execute`].

pub mod colsums;
pub mod tsqr;
pub mod word_count;

use std::io::{self, BufReader, BufWriter, Read, StdinLock, StdoutLock};
use std::process::ExitCode;

use crate::config::{init_logging, RunConfig};
use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypeTag, TypedBytesReader, TypedBytesWriter};
use crate::report::{StatusSink, StreamingReporter};

pub type StdinReader = TypedBytesReader<BufReader<StdinLock<'static>>>;
pub type StdoutWriter = TypedBytesWriter<BufWriter<StdoutLock<'static>>>;

/// Parse arguments, wire stdin/stdout and run `program`.
///
/// Output is flushed on every path. A failure is logged, reported as a
/// status line and turned into exit status 1.
pub fn execute<F>(name: &str, program: F) -> ExitCode
where
    F: FnOnce(&RunConfig, &mut StdinReader, &mut StdoutWriter, &mut dyn StatusSink) -> Result<()>,
{
    let config = RunConfig::from_args();
    init_logging(config.log_level);
    log::info!("{} {:?} starting ({:?} validation)", name, config.phase, config.mode);

    let mut reader = TypedBytesReader::with_mode(BufReader::new(io::stdin().lock()), config.mode);
    let mut writer = TypedBytesWriter::new(BufWriter::new(io::stdout().lock()));
    let mut reporter = StreamingReporter::stderr();

    let result = program(&config, &mut reader, &mut writer, &mut reporter)
        .and_then(|()| writer.flush());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Err(flush) = writer.flush() {
                log::warn!("could not flush output: {}", flush);
            }
            log::error!("{} failed: {}", name, e);
            reporter.status(&format!("error: {}", e));
            ExitCode::FAILURE
        }
    }
}

/// Consume the tag of a value that must be present.
pub(crate) fn required_tag<R: Read>(
    reader: &mut TypedBytesReader<R>,
    context: &'static str,
) -> Result<TypeTag> {
    reader
        .try_next_tag()?
        .ok_or(TypedBytesError::UnexpectedEof { context })
}

/// Consume the tag of the next record's key. `None` at a clean end of stream.
pub(crate) fn record_key_tag<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Option<TypeTag>> {
    match reader.try_next_tag()? {
        Some(TypeTag::ListEnd) => Err(TypedBytesError::UnexpectedListEnd),
        other => Ok(other),
    }
}
