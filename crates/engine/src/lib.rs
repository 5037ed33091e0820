//! # Engine
//!
//! The stream fan-out core: copies one input byte stream to N output
//! sinks without letting a slow or blocked sink stall the others.
//!
//! Layout mirrors the data path:
//! - [`pool`]: blocks of buffered input indexed by absolute offset
//! - [`sink`]: per-output cursors and write discipline
//! - [`allocator`]: which sink is responsible for which span
//! - [`engine`]: the poll-driven loop tying them together
//!
//! The engine is single-threaded and cooperative; its only suspension
//! point is the readiness poll.

mod allocator;
mod engine;
mod pool;
mod sink;
mod stats;

pub use engine::Engine;
pub use stats::{EngineStats, SinkStats};
