//! Run statistics returned by the engine.

use std::time::Duration;

/// Statistics from a completed run
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Total bytes read from the input
    pub bytes_read: u64,

    /// Total bytes delivered across all sinks
    pub bytes_written: u64,

    /// Sinks deactivated by a broken pipe
    pub broken_pipes: usize,

    /// High-water mark of resident pool blocks
    pub peak_resident_blocks: usize,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Per-sink outcome, in table order
    pub sinks: Vec<SinkStats>,
}

/// Final state of one sink
#[derive(Debug, Clone)]
pub struct SinkStats {
    /// Diagnostic name
    pub name: String,

    /// Bytes delivered to this sink
    pub bytes_written: u64,

    /// False when the sink was deactivated by a broken pipe
    pub active: bool,
}

impl EngineStats {
    /// Read throughput in MiB per second
    pub fn throughput_mib_s(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_read as f64 / (1024.0 * 1024.0) / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
