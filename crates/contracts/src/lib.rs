//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! distribution modes, engine configuration, sink targets, and the unified
//! error type. Business crates depend only on this crate; reverse
//! dependencies are prohibited.

mod config;
mod error;
mod sink;

pub use config::{EngineConfig, SplitMode, DEFAULT_BLOCK_SIZE};
pub use error::EngineError;
pub use sink::SinkTarget;
