//! Hadoop streaming status and counter reporting
//!
//! Hadoop picks `reporter:status:` and `reporter:counter:` lines off the
//! task's stderr. Everything reported here is mirrored into the `log`
//! facade; write failures on the side channel are logged and ignored.

use std::io::{self, Write};

/// Counter group used for every counter this crate emits
pub const COUNTER_GROUP: &str = "Program";

/// Level of the `log` copy of each status line, below the default filter
pub const STATUS_LOG_LEVEL: log::Level = log::Level::Debug;

/// Receiver of status lines and counter increments
pub trait StatusSink {
    fn status(&mut self, message: &str);
    fn counter(&mut self, name: &str, delta: u64);
}

/// Sink that writes the Hadoop streaming reporter protocol
pub struct StreamingReporter<W: Write> {
    out: W,
}

impl StreamingReporter<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> StreamingReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusSink for StreamingReporter<W> {
    fn status(&mut self, message: &str) {
        log::log!(STATUS_LOG_LEVEL, "status: {}", message);
        if let Err(e) = writeln!(self.out, "reporter:status:{}", message) {
            log::warn!("could not write status line: {}", e);
        }
    }

    fn counter(&mut self, name: &str, delta: u64) {
        log::debug!("counter {} += {}", name, delta);
        if let Err(e) = writeln!(
            self.out,
            "reporter:counter:{},{},{}",
            COUNTER_GROUP, name, delta
        ) {
            log::warn!("could not write counter line: {}", e);
        }
    }
}

/// Sink that only logs; used when not running under Hadoop and in tests
#[derive(Debug, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn status(&mut self, message: &str) {
        log::log!(STATUS_LOG_LEVEL, "status: {}", message);
    }

    fn counter(&mut self, name: &str, delta: u64) {
        log::trace!("counter {} += {}", name, delta);
    }
}
