//! Column sums over a matrix of TypedBytes rows
//!
//! # Usage
//!
//! ```text
//! colsums map|reduce < input.tb > output.tb
//! ```

use std::process::ExitCode;

use typedbytes_stream::programs::{execute, colsums};

fn main() -> ExitCode {
    execute("colsums", |config, reader, writer, sink| {
        colsums::run(config, reader, writer, sink)
    })
}
