//! Retained state: the part of a boot cycle that survives a reset.
//!
//! The backing memory is an opaque byte buffer (RTC memory on a board, a
//! file on a host). The record is a small JSON object so a human can read
//! it back with any tool.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DecodeError, StoreError};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedRecord {
    /// Epoch seconds of the last completed watering.
    #[serde(rename = "lastwateringtime", default)]
    pub last_water_time: Option<i64>,
}

impl RetainedRecord {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Whether the retained buffer was blank at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootKind {
    /// Buffer was blank: the board lost power rather than rebooting.
    Cold,
    /// Buffer held data from a previous cycle.
    Warm,
}

// ---------------------------------------------------------------------------
// Backing memory
// ---------------------------------------------------------------------------

/// Raw byte buffer that survives a full reset.
pub trait RetainedMemory {
    /// Current buffer contents; empty when nothing was ever written.
    fn read(&self) -> io::Result<Vec<u8>>;
    /// Replace the whole buffer.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// File-backed retained memory for hosts without RTC memory.
#[derive(Debug, Clone)]
pub struct FileMemory {
    path: PathBuf,
}

impl FileMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RetainedMemory for FileMemory {
    fn read(&self) -> io::Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        // Write-then-rename so a power cut leaves either the old or the new
        // record, never a torn one.
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Sole owner of the retained record.
pub struct RetainedStore<M> {
    memory: M,
}

impl<M: RetainedMemory> RetainedStore<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    /// Load the record. Blank, unreadable and corrupt buffers all yield the
    /// empty default.
    pub fn load(&self) -> RetainedRecord {
        self.load_boot().0
    }

    /// Load the record and report whether the buffer was blank.
    pub fn load_boot(&self) -> (RetainedRecord, BootKind) {
        let bytes = match self.memory.read() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("retained memory unreadable, starting empty: {e}");
                return (RetainedRecord::default(), BootKind::Cold);
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            info!("no retained data (board was power-cycled)");
            return (RetainedRecord::default(), BootKind::Cold);
        }

        match RetainedRecord::decode(&bytes) {
            Ok(record) => (record, BootKind::Warm),
            Err(e) => {
                warn!(len = bytes.len(), "{e}; starting empty");
                (RetainedRecord::default(), BootKind::Warm)
            }
        }
    }

    /// Overwrite the buffer with `record`.
    pub fn save(&mut self, record: &RetainedRecord) -> Result<(), StoreError> {
        let bytes = record.encode()?;
        self.memory.write(&bytes)?;
        info!(last_water_time = ?record.last_water_time, "retained record saved");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn memory(&self) -> &M {
        &self.memory
    }
}

// ===========================================================================
// Tests
// ===========================================================================
