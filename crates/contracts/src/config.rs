//! Engine configuration.

use crate::error::EngineError;

/// Default block size: 1 MiB
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// How newly read bytes are distributed across the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// Every byte goes to every sink
    #[default]
    Copy,
    /// Every byte goes to exactly one sink, balancing load
    Scatter,
    /// Scatter, with share boundaries falling immediately after a newline
    ScatterLines,
}

impl SplitMode {
    /// True for both scatter variants
    pub fn is_scatter(self) -> bool {
        !matches!(self, SplitMode::Copy)
    }

    /// True when share boundaries must be newline-aligned
    pub fn line_aligned(self) -> bool {
        matches!(self, SplitMode::ScatterLines)
    }
}

/// Engine configuration, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Size of one pool block in bytes; unit of allocation and reclamation
    pub block_size: usize,

    /// Distribution mode
    pub mode: SplitMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            mode: SplitMode::Copy,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.block_size == 0 {
            return Err(EngineError::config_validation(
                "block_size",
                "must be at least 1 byte",
            ));
        }
        Ok(())
    }
}
