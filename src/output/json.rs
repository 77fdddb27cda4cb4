//! JSON serialization for capabilities and samples.

use serde::Serialize;

use crate::types::{FamilyModel, PerfSample, ProcessorCapabilities};

/// Capabilities plus the decoded family/model, as emitted to collectors.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    /// Raw probe results.
    #[serde(flatten)]
    pub capabilities: ProcessorCapabilities,
    /// Decoded family/model word.
    pub decoded: FamilyModel,
}

impl From<ProcessorCapabilities> for CapabilityReport {
    fn from(capabilities: ProcessorCapabilities) -> Self {
        Self {
            decoded: capabilities.decoded(),
            capabilities,
        }
    }
}

/// One core's sample, tagged with its index.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CoreSample {
    /// Logical CPU.
    pub core: u32,
    /// Counter values.
    #[serde(flatten)]
    pub sample: PerfSample,
}

/// Serialize anything this module emits to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for these types).
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for these types).
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
