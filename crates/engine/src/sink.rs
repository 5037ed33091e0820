//! Sink records: one per output stream, tracking how far the stream has
//! been written and how far the allocator has committed data to it.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use contracts::{EngineError, SinkTarget};
use nix::errno::Errno;
use nix::unistd;
use tracing::trace;

/// Result of one write attempt against a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// The syscall accepted this many bytes (possibly a short write)
    Wrote(usize),
    /// The sink's reader is gone; the sink has been deactivated
    BrokenPipe,
}

/// One output sink.
///
/// Invariant: `pos_written ≤ pos_to_write ≤` the engine's read position.
/// In scatter mode `pos_written` jumps forward when a fresh window is
/// assigned, so `bytes_written` carries the delivered-byte count.
#[derive(Debug)]
pub struct Sink {
    name: String,
    fd: OwnedFd,
    pub(crate) pos_written: u64,
    pub(crate) pos_to_write: u64,
    active: bool,
    bytes_written: u64,
}

impl Sink {
    pub(crate) fn new(target: SinkTarget) -> Self {
        let (name, fd) = target.into_parts();
        Self {
            name,
            fd,
            pos_written: 0,
            pos_to_write: 0,
            active: true,
            bytes_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// No pending bytes: everything assigned has been written
    pub fn is_drained(&self) -> bool {
        self.pos_written == self.pos_to_write
    }

    pub fn has_pending(&self) -> bool {
        self.pos_written < self.pos_to_write
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub(crate) fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Issue one write of the next in-block run of pending bytes.
    ///
    /// `EPIPE` deactivates the sink and is not an error; anything else is
    /// fatal for the run.
    pub(crate) fn write_pending(
        &mut self,
        buf: &[u8],
    ) -> Result<WriteOutcome, EngineError> {
        match unistd::write(self.fd.as_fd(), buf) {
            Ok(n) => {
                self.pos_written += n as u64;
                self.bytes_written += n as u64;
                trace!(sink = %self.name, bytes = n, pos = self.pos_written, "wrote");
                Ok(WriteOutcome::Wrote(n))
            }
            Err(Errno::EPIPE) => {
                self.active = false;
                Ok(WriteOutcome::BrokenPipe)
            }
            Err(errno) => Err(EngineError::sink_write(&self.name, errno_to_io(errno))),
        }
    }
}

pub(crate) fn errno_to_io(errno: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno as i32)
}
