//! Word count over (key, line) TypedBytes records
//!
//! # Usage
//!
//! ```text
//! word_count map|reduce < input.tb > output.tb
//! ```

use std::process::ExitCode;

use typedbytes_stream::programs::{execute, word_count};

fn main() -> ExitCode {
    execute("word_count", |config, reader, writer, sink| {
        word_count::run(config, reader, writer, sink)
    })
}
