//! The fan-out loop: a single-threaded, poll-driven copy of one input
//! stream to many sinks.
//!
//! Each iteration polls the descriptors that can make progress, then runs
//! the writer phase before considering a read. Reading only when no write
//! progressed keeps the resident buffer set close to the minimum needed to
//! bridge the slowest sink.

use std::os::fd::AsFd;
use std::time::Instant;

use contracts::{EngineConfig, EngineError, SinkTarget};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, info, trace, warn};

use crate::allocator;
use crate::pool::BlockPool;
use crate::sink::{errno_to_io, Sink, WriteOutcome};
use crate::stats::{EngineStats, SinkStats};

/// One-shot fan-out engine. Construct, then `run` to completion.
pub struct Engine<S: AsFd> {
    config: EngineConfig,
    source: S,
    pool: BlockPool,
    sinks: Vec<Sink>,
    /// Count of bytes successfully read; all cursors live in [0, this]
    source_pos_read: u64,
    reached_eof: bool,
    bytes_written: u64,
    broken_pipes: usize,
    peak_resident_blocks: usize,
}

impl<S: AsFd> Engine<S> {
    /// Build an engine over an input descriptor and an ordered sink list
    pub fn new(
        config: EngineConfig,
        source: S,
        targets: Vec<SinkTarget>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let pool = BlockPool::new(config.block_size);
        let sinks = targets.into_iter().map(Sink::new).collect();
        Ok(Self {
            config,
            source,
            pool,
            sinks,
            source_pos_read: 0,
            reached_eof: false,
            bytes_written: 0,
            broken_pipes: 0,
            peak_resident_blocks: 0,
        })
    }

    /// Drive the loop until the input is drained or every sink is gone
    pub fn run(mut self) -> Result<EngineStats, EngineError> {
        let started = Instant::now();
        info!(
            sinks = self.sinks.len(),
            mode = ?self.config.mode,
            block_size = self.config.block_size,
            "fan-out started"
        );

        loop {
            // Bytes nobody will drain are not worth reading: a run whose
            // sinks have all gone away ends as if the input had.
            if self.sinks.iter().all(|s| !s.is_active()) {
                debug!("no active sinks left; terminating");
                break;
            }

            let Some((source_ready, sinks_ready)) = self.poll_ready()? else {
                break;
            };

            let written = self.writer_phase(&sinks_ready)?;
            if written > 0 {
                // Downstream progressed; loop again before reading so the
                // pool does not grow past what the sinks require.
                continue;
            }

            if source_ready {
                self.reader_phase()?;
            }
        }

        Ok(self.into_stats(started))
    }

    /// Block until some descriptor can make progress.
    ///
    /// Returns `None` when the input is exhausted and no sink has pending
    /// bytes, which is the clean-exit condition. Error or hangup readiness counts
    /// as ready so the subsequent syscall can observe the condition.
    fn poll_ready(&self) -> Result<Option<(bool, Vec<bool>)>, EngineError> {
        let mut fds = Vec::with_capacity(self.sinks.len() + 1);
        let mut slots = Vec::with_capacity(self.sinks.len() + 1);

        if !self.reached_eof {
            fds.push(PollFd::new(self.source.as_fd(), PollFlags::POLLIN));
            slots.push(None);
        }
        for (index, sink) in self.sinks.iter().enumerate() {
            if sink.is_active() && sink.pos_written < self.source_pos_read {
                fds.push(PollFd::new(sink.fd(), PollFlags::POLLOUT));
                slots.push(Some(index));
            }
        }

        if self.reached_eof && fds.is_empty() {
            return Ok(None);
        }

        poll(&mut fds, PollTimeout::NONE).map_err(|e| EngineError::Poll {
            source: errno_to_io(e),
        })?;

        let mut source_ready = false;
        let mut sinks_ready = vec![false; self.sinks.len()];
        for (fd, slot) in fds.iter().zip(&slots) {
            let revents = fd.revents().unwrap_or_else(PollFlags::empty);
            match slot {
                None => {
                    source_ready = revents
                        .intersects(PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP);
                }
                Some(index) => {
                    sinks_ready[*index] = revents
                        .intersects(PollFlags::POLLOUT | PollFlags::POLLERR | PollFlags::POLLHUP);
                }
            }
        }
        Ok(Some((source_ready, sinks_ready)))
    }

    /// Allocate fresh data, then write once to every ready sink.
    /// Returns the bytes written this iteration.
    fn writer_phase(&mut self, sinks_ready: &[bool]) -> Result<u64, EngineError> {
        allocator::assign(
            self.config.mode,
            &mut self.sinks,
            sinks_ready,
            &self.pool,
            self.source_pos_read,
            self.reached_eof,
        )?;

        let mut written = 0u64;
        for (index, sink) in self.sinks.iter_mut().enumerate() {
            if !sinks_ready[index] || !sink.has_pending() {
                continue;
            }
            let buf = self.pool.sink_slice(sink.pos_written, sink.pos_to_write);
            match sink.write_pending(buf)? {
                WriteOutcome::Wrote(n) => written += n as u64,
                WriteOutcome::BrokenPipe => {
                    self.broken_pipes += 1;
                    warn!(sink = %sink.name(), "reader closed early; sink deactivated");
                }
            }
        }
        self.bytes_written += written;

        // Reclaim every block the slowest active sink has fully passed.
        let min_pos = self
            .sinks
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.pos_written)
            .min()
            .unwrap_or(self.source_pos_read);
        self.pool.release_before(min_pos);

        Ok(written)
    }

    /// Issue one read into the pool at the current read position
    fn reader_phase(&mut self) -> Result<(), EngineError> {
        let buf = self.pool.source_slice(self.source_pos_read);
        match nix::unistd::read(self.source.as_fd(), buf) {
            Ok(0) => {
                self.reached_eof = true;
                debug!(total = self.source_pos_read, "end of input");
            }
            Ok(n) => {
                self.source_pos_read += n as u64;
                trace!(bytes = n, pos = self.source_pos_read, "read");
            }
            Err(errno) => {
                return Err(EngineError::SourceRead {
                    source: errno_to_io(errno),
                })
            }
        }
        self.peak_resident_blocks = self.peak_resident_blocks.max(self.pool.resident_blocks());
        Ok(())
    }

    fn into_stats(self, started: Instant) -> EngineStats {
        let stats = EngineStats {
            bytes_read: self.source_pos_read,
            bytes_written: self.bytes_written,
            broken_pipes: self.broken_pipes,
            peak_resident_blocks: self.peak_resident_blocks,
            duration: started.elapsed(),
            sinks: self
                .sinks
                .iter()
                .map(|s| SinkStats {
                    name: s.name().to_string(),
                    bytes_written: s.bytes_written(),
                    active: s.is_active(),
                })
                .collect(),
        };
        debug!(
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            broken_pipes = stats.broken_pipes,
            "fan-out finished"
        );
        stats
    }
}
