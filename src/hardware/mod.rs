//! Hardware primitives: the processor identification query and the cycle
//! counter.
//!
//! Everything above this module is ordinary portable logic. The [`Hardware`]
//! trait is the seam: [`NativeHardware`] issues the real instructions, and
//! tests substitute a fake that replays scripted register values and cycle
//! counts.
//!
//! # Platforms
//!
//! - **x86_64**: `cpuid` and `lfence; rdtsc`
//! - **other**: identification reports all-zero registers (so no vendor or
//!   feature ever matches) and the cycle counter falls back to a monotonic
//!   nanosecond clock

mod cpuid;
mod tsc;

pub use cpuid::cpuid;
pub use tsc::read_cycles;

/// Register outputs of one identification query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuidResult {
    /// EAX output.
    pub eax: u32,
    /// EBX output.
    pub ebx: u32,
    /// ECX output.
    pub ecx: u32,
    /// EDX output.
    pub edx: u32,
}

/// The two hardware operations the sampler depends on.
pub trait Hardware {
    /// Issue the identification query for `leaf` (subleaf 0).
    fn identify(&self, leaf: u32) -> CpuidResult;

    /// Read the free-running cycle counter.
    ///
    /// Implementations must not be reordered relative to the register reads
    /// surrounding them; the acquisition protocol times each read with it.
    fn read_cycles(&self) -> u64;
}

impl<H: Hardware + ?Sized> Hardware for &H {
    #[inline]
    fn identify(&self, leaf: u32) -> CpuidResult {
        (**self).identify(leaf)
    }

    #[inline]
    fn read_cycles(&self) -> u64 {
        (**self).read_cycles()
    }
}

/// The executing processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHardware;

impl Hardware for NativeHardware {
    #[inline]
    fn identify(&self, leaf: u32) -> CpuidResult {
        cpuid(leaf)
    }

    #[inline]
    fn read_cycles(&self) -> u64 {
        read_cycles()
    }
}
