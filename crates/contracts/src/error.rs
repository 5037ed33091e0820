//! Error taxonomy for the fan-out engine.
//!
//! Split by source: config / input / sink / multiplexer / line scanning.
//! Broken pipes are deliberately absent: a sink whose reader went away is
//! deactivated, not an error.

use thiserror::Error;

/// Unified error type crossing crate boundaries
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected before the engine started
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Failed to open an output path
    #[error("failed to open sink '{path}': {source}")]
    SinkOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Read from the input stream failed
    #[error("error reading input: {source}")]
    SourceRead {
        #[source]
        source: std::io::Error,
    },

    /// Write to a sink failed with something other than a broken pipe
    #[error("error writing to sink '{name}': {source}")]
    SinkWrite {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The readiness multiplexer failed (signal interruption included)
    #[error("poll failed: {source}")]
    Poll {
        #[source]
        source: std::io::Error,
    },

    /// Line-aligned scatter found no newline inside a full share
    #[error("no newline within a share of {span} bytes; increase the block size (-b)")]
    NoLineBoundary { span: u64 },
}

impl EngineError {
    /// Create a config validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a sink open error
    pub fn sink_open(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::SinkOpen {
            path: path.into(),
            source,
        }
    }

    /// Create a sink write error
    pub fn sink_write(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::SinkWrite {
            name: name.into(),
            source,
        }
    }
}
