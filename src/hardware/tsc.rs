//! Time-stamp counter access.

/// Read the cycle counter with serialization.
///
/// On x86_64 this is `lfence; rdtsc`, fenced for the compiler on both sides,
/// so it cannot drift across the register reads it brackets. The high half of
/// the counter lands in the upper 32 bits.
///
/// On other platforms, falls back to nanoseconds since the first call.
#[inline]
pub fn read_cycles() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        rdtsc_x86_64()
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        rdtsc_fallback()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn rdtsc_x86_64() -> u64 {
    use std::sync::atomic::{compiler_fence, Ordering};

    compiler_fence(Ordering::SeqCst);

    let low: u32;
    let high: u32;
    // SAFETY: lfence and rdtsc touch only eax/edx and exist on every x86_64 part.
    unsafe {
        // lfence keeps rdtsc from executing ahead of the preceding pread
        std::arch::asm!(
            "lfence",
            "rdtsc",
            out("eax") low,
            out("edx") high,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);

    combine(low, high)
}

#[cfg(not(target_arch = "x86_64"))]
#[inline]
fn rdtsc_fallback() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();

    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

#[inline]
#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
fn combine(low: u32, high: u32) -> u64 {
    u64::from(low) | (u64::from(high) << 32)
}
