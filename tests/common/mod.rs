//! Fakes for the hardware and register-device seams.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aperf_sampler::{CpuidResult, Hardware, RegisterDevice, RegisterHandle};

pub const APERF: u64 = 0xe8;
pub const MPERF: u64 = 0xe7;

/// Cycle counter replaying one `(aperf_cycles, mperf_cycles)` pair per attempt.
///
/// Each attempt consumes three counter reads. Reading past the script panics,
/// which is how tests notice an acquisition running more attempts than
/// expected.
pub struct ScriptedCycles {
    ticks: Vec<u64>,
    next: AtomicUsize,
    cpuid: HashMap<u32, CpuidResult>,
}

impl ScriptedCycles {
    pub fn new(attempts: &[(u64, u64)]) -> Self {
        let mut ticks = Vec::with_capacity(attempts.len() * 3);
        let mut now = 1_000u64;
        for &(aperf_cycles, mperf_cycles) in attempts {
            let t0 = now;
            let t1 = t0.wrapping_add(aperf_cycles);
            let t2 = t1.wrapping_add(mperf_cycles);
            ticks.extend([t0, t1, t2]);
            now = t2.wrapping_add(500);
        }
        Self {
            ticks,
            next: AtomicUsize::new(0),
            cpuid: HashMap::new(),
        }
    }

    /// Start the script at `start` instead of the default base.
    pub fn starting_at(start: u64, attempts: &[(u64, u64)]) -> Self {
        let mut script = Self::new(attempts);
        let shift = start.wrapping_sub(1_000);
        for t in &mut script.ticks {
            *t = t.wrapping_add(shift);
        }
        script
    }

    /// Repeat the same pair `n` times.
    pub fn repeat(pair: (u64, u64), n: usize) -> Self {
        Self::new(&vec![pair; n])
    }

    pub fn with_leaf(mut self, leaf: u32, regs: CpuidResult) -> Self {
        self.cpuid.insert(leaf, regs);
        self
    }

    pub fn reads(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl Hardware for ScriptedCycles {
    fn identify(&self, leaf: u32) -> CpuidResult {
        self.cpuid.get(&leaf).copied().unwrap_or_default()
    }

    fn read_cycles(&self) -> u64 {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        match self.ticks.get(i) {
            Some(&t) => t,
            None => panic!("cycle counter read {} past the {}-tick script", i, self.ticks.len()),
        }
    }
}

thread_local! {
    static STEADY_TICKS: Cell<u64> = const { Cell::new(0) };
}

/// Cycle counter that always reports equal read durations.
///
/// The count is per thread, so concurrent samplers never see each other's
/// reads as skew.
#[derive(Debug, Default)]
pub struct SteadyCycles;

impl SteadyCycles {
    pub fn new() -> Self {
        Self
    }
}

impl Hardware for SteadyCycles {
    fn identify(&self, _leaf: u32) -> CpuidResult {
        CpuidResult::default()
    }

    fn read_cycles(&self) -> u64 {
        STEADY_TICKS.with(|ticks| {
            let now = ticks.get().wrapping_add(100);
            ticks.set(now);
            now
        })
    }
}

/// How a fake handle answers reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Return the stored register value.
    Normal,
    /// Return only this many bytes.
    Short(usize),
    /// Fail every read with `EIO`.
    Eio,
}

#[derive(Debug, Default)]
struct DeviceState {
    registers: HashMap<(u32, u64), u64>,
    opens: HashMap<u32, usize>,
    live: HashMap<u32, usize>,
    refuse: HashSet<u32>,
    mode: HashMap<(u32, u64), ReadMode>,
    reads: Vec<(u32, u64)>,
}

/// In-memory register file with open and read accounting.
#[derive(Clone, Default)]
pub struct FakeMsr {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeMsr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, core: u32, offset: u64, value: u64) {
        self.state.lock().unwrap().registers.insert((core, offset), value);
    }

    pub fn set_pair(&self, core: u32, aperf: u64, mperf: u64) {
        self.set(core, APERF, aperf);
        self.set(core, MPERF, mperf);
    }

    pub fn refuse_open(&self, core: u32, refuse: bool) {
        let mut state = self.state.lock().unwrap();
        if refuse {
            state.refuse.insert(core);
        } else {
            state.refuse.remove(&core);
        }
    }

    pub fn read_mode(&self, core: u32, offset: u64, mode: ReadMode) {
        self.state.lock().unwrap().mode.insert((core, offset), mode);
    }

    pub fn opens(&self, core: u32) -> usize {
        self.state.lock().unwrap().opens.get(&core).copied().unwrap_or(0)
    }

    /// Handles for `core` that are open and not yet dropped.
    pub fn live_handles(&self, core: u32) -> usize {
        self.state.lock().unwrap().live.get(&core).copied().unwrap_or(0)
    }

    pub fn reads(&self) -> Vec<(u32, u64)> {
        self.state.lock().unwrap().reads.clone()
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    core: u32,
    state: Arc<Mutex<DeviceState>>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(live) = state.live.get_mut(&self.core) {
            *live -= 1;
        }
    }
}

impl RegisterHandle for FakeHandle {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.reads.push((self.core, offset));

        let mode = state
            .mode
            .get(&(self.core, offset))
            .copied()
            .unwrap_or(ReadMode::Normal);
        let value = state.registers.get(&(self.core, offset)).copied().unwrap_or(0);
        let bytes = value.to_ne_bytes();

        match mode {
            ReadMode::Normal => {
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            ReadMode::Short(n) => {
                let n = n.min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            ReadMode::Eio => Err(io::Error::from_raw_os_error(libc::EIO)),
        }
    }
}

impl RegisterDevice for FakeMsr {
    type Handle = FakeHandle;

    fn open(&self, core: u32) -> io::Result<FakeHandle> {
        let mut state = self.state.lock().unwrap();
        if state.refuse.contains(&core) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        *state.opens.entry(core).or_insert(0) += 1;
        *state.live.entry(core).or_insert(0) += 1;
        Ok(FakeHandle {
            core,
            state: Arc::clone(&self.state),
        })
    }
}
