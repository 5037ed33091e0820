//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use contracts::{EngineConfig, SplitMode, DEFAULT_BLOCK_SIZE};

/// streamtee - buffering tee with fair scatter
#[derive(Parser, Debug)]
#[command(
    name = "streamtee",
    author,
    version,
    about = "Fan standard input out to many sinks without letting a slow one stall the rest",
    long_about = "Copies standard input to every named output (default), or scatters it \n\
                  so each byte reaches exactly one output, balancing load across them. \n\
                  Buffering is bounded: reads are only issued when no write can make \n\
                  progress, so a slow or blocked sink never forces unbounded memory."
)]
pub struct Cli {
    /// Buffer pool block size in bytes
    #[arg(
        short = 'b',
        long,
        default_value_t = DEFAULT_BLOCK_SIZE,
        env = "STREAMTEE_BLOCK_SIZE",
        value_name = "BYTES"
    )]
    pub block_size: usize,

    /// Scatter the input across the outputs instead of copying it to each
    #[arg(short, long)]
    pub scatter: bool,

    /// Split scattered data on line boundaries (only meaningful with -s)
    #[arg(short, long)]
    pub lines: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "STREAMTEE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        env = "STREAMTEE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Output sink paths, in order
    #[arg(required = true, value_name = "OUTPUT")]
    pub outputs: Vec<PathBuf>,
}

impl Cli {
    /// Engine configuration implied by the flags.
    ///
    /// `-l` without `-s` is accepted and ignored; line alignment is only
    /// ever consulted when scattering.
    pub fn engine_config(&self) -> EngineConfig {
        let mode = match (self.scatter, self.lines) {
            (true, true) => SplitMode::ScatterLines,
            (true, false) => SplitMode::Scatter,
            (false, _) => SplitMode::Copy,
        };
        EngineConfig {
            block_size: self.block_size,
            mode,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}
