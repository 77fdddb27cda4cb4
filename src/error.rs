//! Error types for register access and sample acquisition.

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure while talking to a core's register-access device.
///
/// Every variant is treated as fatal for the core by
/// [`MsrSampler::acquire_sample`](crate::MsrSampler::acquire_sample): it is
/// returned immediately and never retried.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Opening the per-core device node failed (missing permission, offline or
    /// nonexistent core, `msr` module not loaded).
    #[error("cpu {core}: failed to open msr device: {source}")]
    Open {
        /// Core whose device could not be opened.
        core: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The positioned read returned fewer than eight bytes.
    #[error("cpu {core}: short read at msr {offset:#x} ({read} of 8 bytes)")]
    ShortRead {
        /// Core that was read.
        core: u32,
        /// Register offset.
        offset: u64,
        /// Bytes actually returned.
        read: usize,
    },

    /// The positioned read itself failed (the kernel rejects reads of
    /// registers the CPU does not implement with `EIO`).
    #[error("cpu {core}: read of msr {offset:#x} failed: {source}")]
    Read {
        /// Core that was read.
        core: u32,
        /// Register offset.
        offset: u64,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl RegisterError {
    /// Core the failure belongs to.
    pub fn core(&self) -> u32 {
        match self {
            RegisterError::Open { core, .. }
            | RegisterError::ShortRead { core, .. }
            | RegisterError::Read { core, .. } => *core,
        }
    }
}

/// Errors surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A size or configuration value was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Memory for the handle table could not be obtained.
    #[error("failed to allocate handle table for {slots} cpus")]
    Allocation {
        /// Number of slots requested.
        slots: u32,
    },

    /// A register read was attempted before the handle table was allocated.
    #[error("handle table is not initialized")]
    NotInitialized,

    /// The core index is not covered by the allocated table.
    #[error("cpu {core} is out of range (table holds {max_cpu_num} cpus)")]
    CoreOutOfRange {
        /// Requested core.
        core: u32,
        /// Table size fixed at allocation.
        max_cpu_num: u32,
    },

    /// Register access broke; fatal for that core.
    #[error(transparent)]
    Io(#[from] RegisterError),

    /// No consistent APERF/MPERF pair was obtained within the retry budget.
    #[error("cpu {core}: no consistent aperf/mperf pair after {attempts} attempts")]
    Timeout {
        /// Core that was sampled.
        core: u32,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The processor does not expose the APERF/MPERF counters.
    #[error("processor does not support aperf/mperf counters")]
    Unsupported,
}

impl Error {
    /// Whether this is a register I/O failure (`Failed(IoError)`).
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Whether the consistency check never passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
