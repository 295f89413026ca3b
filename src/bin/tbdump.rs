//! Print the structure of a TypedBytes file
//!
//! # Usage
//!
//! ```text
//! tbdump FILE      # memory-mapped
//! tbdump -         # stdin
//! ```

use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use typedbytes_stream::config::{init_logging, CommonArgs};
use typedbytes_stream::dump::dump_all;
use typedbytes_stream::mapped::MappedInput;
use typedbytes_stream::{Result, TypedBytesReader};

#[derive(Debug, Parser)]
#[command(version, about = "Print every value in a TypedBytes stream")]
struct Cli {
    /// File to dump, or `-` for stdin
    input: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn run(cli: &Cli) -> Result<usize> {
    let mut out = BufWriter::new(io::stdout().lock());
    let mode = cli.common.mode();

    if cli.input.as_os_str() == "-" {
        let mut reader = TypedBytesReader::with_mode(BufReader::new(io::stdin().lock()), mode);
        return dump_all(&mut reader, &mut out);
    }

    let input = MappedInput::open(&cli.input)?;
    log::debug!("mapped {} ({} bytes)", cli.input.display(), input.len());
    let mut reader = TypedBytesReader::with_mode(input.as_bytes(), mode);
    dump_all(&mut reader, &mut out)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.common.log_level.into());

    match run(&cli) {
        Ok(values) => {
            log::info!("dumped {} values", values);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("cannot dump {}: {}", cli.input.display(), e);
            ExitCode::FAILURE
        }
    }
}
