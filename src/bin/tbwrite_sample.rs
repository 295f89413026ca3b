//! Write the reference TypedBytes stream to a file
//!
//! ```text
//! tbwrite_sample sample.tb && tbdump sample.tb
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use typedbytes_stream::config::{init_logging, CommonArgs};
use typedbytes_stream::dump::write_sample;
use typedbytes_stream::{Result, TypedBytesWriter};

#[derive(Debug, Parser)]
#[command(version, about = "Write a TypedBytes file holding one of every type")]
struct Cli {
    /// Destination file (overwritten)
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn run(cli: &Cli) -> Result<()> {
    let file = File::create(&cli.output)?;
    let mut writer = TypedBytesWriter::new(BufWriter::new(file));
    write_sample(&mut writer)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.common.log_level.into());

    match run(&cli) {
        Ok(()) => {
            log::info!("wrote {}", cli.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("cannot write {}: {}", cli.output.display(), e);
            ExitCode::FAILURE
        }
    }
}
