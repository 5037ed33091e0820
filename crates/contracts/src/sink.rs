//! Sink targets: named output descriptors handed to the engine.

use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::path::Path;

use crate::error::EngineError;

/// One output target: a name for diagnostics plus the owned descriptor.
///
/// Targets come either from paths opened by the CLI or from descriptors
/// inherited from an embedding environment; the engine does not
/// distinguish.
#[derive(Debug)]
pub struct SinkTarget {
    name: String,
    fd: OwnedFd,
}

impl SinkTarget {
    /// Open a path for writing, creating it if missing and truncating it
    /// if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| EngineError::sink_open(path.display().to_string(), e))?;
        Ok(Self {
            name: path.display().to_string(),
            fd: file.into(),
        })
    }

    /// Wrap an already open descriptor
    pub fn from_fd(name: impl Into<String>, fd: OwnedFd) -> Self {
        Self {
            name: name.into(),
            fd,
        }
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Split into name and descriptor
    pub fn into_parts(self) -> (String, OwnedFd) {
        (self.name, self.fd)
    }
}
