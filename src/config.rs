//! Configuration for sample acquisition.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::msr::DEFAULT_DEVICE_ROOT;

/// Configuration options for [`MsrSampler`](crate::MsrSampler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Attempts per acquisition before giving up with a timeout (default: 5).
    pub max_attempts: u32,

    /// Largest tolerated ratio between the APERF and MPERF read durations
    /// (default: 2).
    ///
    /// A pair is rejected when either read took more than this many times as
    /// long as the other.
    pub timeout_ratio: u64,

    /// Directory holding the per-core `<n>/msr` nodes (default: `/dev/cpu`).
    pub device_root: PathBuf,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            timeout_ratio: 2,
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
        }
    }
}

impl SamplerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt cap.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the tolerated read-duration ratio.
    pub fn timeout_ratio(mut self, ratio: u64) -> Self {
        self.timeout_ratio = ratio;
        self
    }

    /// Set the device node root.
    pub fn device_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.device_root = root.into();
        self
    }

    /// Check that the budget can ever produce a sample.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `max_attempts` or `timeout_ratio` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeout_ratio == 0 {
            return Err(Error::InvalidArgument(
                "timeout_ratio must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
