//! Microarchitecture probe: vendor signature, family/model word and counter
//! feature bit.

use crate::hardware::Hardware;
use crate::types::ProcessorCapabilities;

/// Leaf 0 vendor signature, as it lands in EBX, EDX, ECX ("Genu" "ineI" "ntel").
pub const VENDOR_EBX: u32 = 0x756e_6547;
/// See [`VENDOR_EBX`].
pub const VENDOR_EDX: u32 = 0x4965_6e69;
/// See [`VENDOR_EBX`].
pub const VENDOR_ECX: u32 = 0x6c65_746e;

const LEAF_VENDOR: u32 = 0;
const LEAF_FAMILY_MODEL: u32 = 1;
const LEAF_THERMAL_POWER: u32 = 6;

/// Leaf 6 ECX bit 0: hardware coordination feedback (APERF/MPERF).
const ECX_APERFMPERF: u32 = 1 << 0;

/// True iff all three vendor identifier registers match exactly.
pub fn detect_vendor<H: Hardware>(hw: &H) -> bool {
    let r = hw.identify(LEAF_VENDOR);
    r.ebx == VENDOR_EBX && r.edx == VENDOR_EDX && r.ecx == VENDOR_ECX
}

/// Raw family/model/stepping word (leaf 1 EAX).
pub fn read_family_model<H: Hardware>(hw: &H) -> u32 {
    hw.identify(LEAF_FAMILY_MODEL).eax
}

/// Whether leaf 6 advertises the APERF/MPERF counters.
pub fn supports_counter_feature<H: Hardware>(hw: &H) -> bool {
    hw.identify(LEAF_THERMAL_POWER).ecx & ECX_APERFMPERF != 0
}

impl ProcessorCapabilities {
    /// Run all three probes against `hw`.
    pub fn detect<H: Hardware>(hw: &H) -> Self {
        Self {
            is_target_vendor: detect_vendor(hw),
            family_model: read_family_model(hw),
            supports_fast_counter_read: supports_counter_feature(hw),
        }
    }
}
