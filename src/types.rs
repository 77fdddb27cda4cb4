//! Value types shared across the crate.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One consistent APERF/MPERF reading from a single core.
///
/// Raw counter values; deriving a frequency ratio from two successive samples
/// is left to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfSample {
    /// Actual-performance counter (ticks at the delivered clock).
    pub aperf: u64,
    /// Maximum-performance counter (ticks at the reference clock).
    pub mperf: u64,
}

/// Decoded view of the leaf 1 family/model/stepping word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyModel {
    /// Display family (base family plus extended family when base is 0xF).
    pub family: u32,
    /// Display model (extended model folded in for family 6 and above).
    pub model: u32,
    /// Stepping id.
    pub stepping: u32,
}

impl FamilyModel {
    /// Decode the raw EAX word returned by identification leaf 1.
    pub fn decode(word: u32) -> Self {
        let mut family = (word >> 8) & 0xf;
        let mut model = (word >> 4) & 0xf;
        if family == 0xf {
            family += (word >> 20) & 0xff;
        }
        if family >= 6 {
            model += ((word >> 16) & 0xf) << 4;
        }
        Self {
            family,
            model,
            stepping: word & 0xf,
        }
    }
}

/// What the probe found out about the executing processor.
///
/// Computed once at startup and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorCapabilities {
    /// Vendor signature matched `GenuineIntel`.
    pub is_target_vendor: bool,
    /// Raw leaf 1 family/model/stepping word.
    pub family_model: u32,
    /// Leaf 6 advertises the APERF/MPERF counters.
    pub supports_fast_counter_read: bool,
}

impl ProcessorCapabilities {
    /// Decoded family and model.
    pub fn decoded(&self) -> FamilyModel {
        FamilyModel::decode(self.family_model)
    }

    /// Fail with [`Error::Unsupported`] unless the counters are available.
    pub fn require_counters(&self) -> Result<()> {
        if self.supports_fast_counter_read {
            Ok(())
        } else {
            Err(Error::Unsupported)
        }
    }
}
