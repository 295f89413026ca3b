//! Command-line configuration shared by the streaming programs

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::protocol::ValidationMode;

/// Rows per column in one TSQR block
pub const DEFAULT_BLOCK_SIZE: usize = 3;

/// Largest accepted `--block-size`
pub const MAX_BLOCK_SIZE: usize = 1 << 16;

fn parse_block_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{}", e))?;
    if (1..=MAX_BLOCK_SIZE).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between 1 and {}", MAX_BLOCK_SIZE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Phase {
    /// Read (key, row) records and emit partial results
    Map,
    /// Merge partial results that share a key
    Reduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Options every tool accepts
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Skip the tag check on primitive reads
    #[arg(long, conflicts_with = "strict")]
    pub permissive: bool,

    /// Check that every primitive read matches the tag just consumed (default)
    #[arg(long)]
    pub strict: bool,

    /// Diagnostics written to stderr
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl CommonArgs {
    pub fn mode(&self) -> ValidationMode {
        if self.permissive {
            ValidationMode::Permissive
        } else {
            ValidationMode::Strict
        }
    }
}

/// Arguments of a map/reduce streaming program
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Hadoop streaming program over TypedBytes on stdin/stdout")]
pub struct ProgramArgs {
    #[command(subcommand)]
    pub phase: Phase,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Seed for the random output keys (entropy when omitted)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Rows per column accumulated before a block is compressed
    #[arg(long, global = true, default_value_t = DEFAULT_BLOCK_SIZE, value_parser = parse_block_size)]
    pub block_size: usize,
}

/// Run-time settings after argument parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub phase: Phase,
    pub mode: ValidationMode,
    pub log_level: LevelFilter,
    pub seed: Option<u64>,
    pub block_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            phase: Phase::Map,
            mode: ValidationMode::Strict,
            log_level: LevelFilter::Info,
            seed: None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl From<ProgramArgs> for RunConfig {
    fn from(args: ProgramArgs) -> Self {
        Self {
            phase: args.phase,
            mode: args.common.mode(),
            log_level: args.common.log_level.into(),
            seed: args.seed,
            block_size: args.block_size.clamp(1, MAX_BLOCK_SIZE),
        }
    }
}

impl RunConfig {
    /// Parse the process arguments; exits with a usage message on error.
    pub fn from_args() -> Self {
        ProgramArgs::parse().into()
    }
}

/// Install the stderr logger. A second call is a no-op.
pub fn init_logging(level: LevelFilter) {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: RunConfig = ProgramArgs::parse_from(["colsums", "map"]).into();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_reduce_with_options() {
        let config: RunConfig = ProgramArgs::parse_from([
            "tsqr",
            "--permissive",
            "--log-level",
            "debug",
            "reduce",
            "--seed",
            "7",
            "--block-size",
            "5",
        ])
        .into();
        assert_eq!(config.phase, Phase::Reduce);
        assert_eq!(config.mode, ValidationMode::Permissive);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.block_size, 5);
    }

    #[test]
    fn test_block_size_bounds() {
        for bad in ["0", "-1", "65537", "9223372036854775807"] {
            assert!(
                ProgramArgs::try_parse_from(["tsqr", "map", "--block-size", bad]).is_err(),
                "accepted {}",
                bad
            );
        }
        let config: RunConfig = ProgramArgs::parse_from(["tsqr", "map", "--block-size", "65536"]).into();
        assert_eq!(config.block_size, MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_missing_phase_is_usage_error() {
        assert!(ProgramArgs::try_parse_from(["colsums"]).is_err());
        assert!(ProgramArgs::try_parse_from(["colsums", "combine"]).is_err());
    }

    #[test]
    fn test_strict_and_permissive_conflict() {
        assert!(ProgramArgs::try_parse_from(["colsums", "--strict", "--permissive", "map"]).is_err());
    }
}
