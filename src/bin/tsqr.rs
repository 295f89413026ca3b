//! Tall-skinny block reduction over a matrix of TypedBytes rows
//!
//! # Usage
//!
//! ```text
//! tsqr [--block-size N] [--seed S] map|reduce < input.tb > output.tb
//! ```

use std::process::ExitCode;

use typedbytes_stream::programs::{execute, tsqr};

fn main() -> ExitCode {
    execute("tsqr", |config, reader, writer, sink| {
        tsqr::run(config, reader, writer, sink)
    })
}
