//! Processor identification query.

use super::CpuidResult;

/// Issue `cpuid` for `leaf`, subleaf 0.
///
/// On non-x86_64 targets every register reads as zero.
#[inline]
pub fn cpuid(leaf: u32) -> CpuidResult {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: cpuid is available on every x86_64 processor.
        let r = unsafe { std::arch::x86_64::__cpuid_count(leaf, 0) };
        CpuidResult {
            eax: r.eax,
            ebx: r.ebx,
            ecx: r.ecx,
            edx: r.edx,
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = leaf;
        CpuidResult::default()
    }
}
