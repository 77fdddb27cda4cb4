//! Jitter-checked APERF/MPERF acquisition.
//!
//! APERF and MPERF are read with two separate `pread` calls, so nothing makes
//! the pair atomic. Each read is bracketed by cycle-counter reads; if one read
//! took disproportionately longer than the other, something (an interrupt, a
//! context switch, a frequency transition) landed between them and the pair is
//! thrown away. The retry budget bounds how long one acquisition can take.
//!
//! # Protocol
//!
//! Per attempt:
//!
//! 1. Priming read of APERF (discarded), so the timed reads below start from a
//!    warm handle and are more likely to run back to back
//! 2. `t0`, read APERF, `t1`, read MPERF, `t2`
//! 3. Reject if `t1 - t0 > ratio * (t2 - t1)` or `t2 - t1 > ratio * (t1 - t0)`
//!
//! Any register I/O failure ends the acquisition immediately. Only rejected
//! pairs are retried.
//!
//! # Cancellation
//!
//! There is none. An in-flight `pread` cannot be interrupted; callers that need
//! a wall-clock deadline must race the call externally.

use log::{debug, trace};

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::hardware::{Hardware, NativeHardware};
use crate::msr::{HandleTable, Msr, MsrDevice, RegisterDevice};
use crate::probe;
use crate::types::{PerfSample, ProcessorCapabilities};

/// State of one acquisition.
#[derive(Debug)]
pub enum AcquireState {
    /// About to run attempt `n` (zero based).
    Attempting(u32),
    /// A consistent pair was read.
    Succeeded(PerfSample),
    /// Register access failed; not retried.
    Failed(Error),
    /// Every attempt was rejected by the consistency check.
    TimedOut,
}

impl AcquireState {
    /// Whether the acquisition is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AcquireState::Attempting(_))
    }

    /// Transition after running attempt `n` with the given outcome.
    ///
    /// Non-`Attempting` states are terminal and returned unchanged.
    pub fn next(self, outcome: Result<TimedRead>, budget: &mut RetryBudget) -> AcquireState {
        let n = match self {
            AcquireState::Attempting(n) => n,
            terminal => return terminal,
        };

        let read = match outcome {
            Ok(read) => read,
            Err(err) => return AcquireState::Failed(err),
        };

        budget.attempts_made = n + 1;
        if budget.is_consistent(read.aperf_cycles, read.mperf_cycles) {
            return AcquireState::Succeeded(read.sample);
        }

        trace!(
            "attempt {}: rejected pair, aperf read {} cycles, mperf read {} cycles",
            n,
            read.aperf_cycles,
            read.mperf_cycles
        );
        if budget.is_exhausted() {
            AcquireState::TimedOut
        } else {
            AcquireState::Attempting(n + 1)
        }
    }
}

/// Acquisition-local attempt accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Attempts completed so far.
    pub attempts_made: u32,
    /// Attempt cap.
    pub max_attempts: u32,
    /// Tolerated ratio between the two read durations.
    pub timeout_ratio: u64,
}

impl RetryBudget {
    /// Fresh budget from `config`.
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            attempts_made: 0,
            max_attempts: config.max_attempts,
            timeout_ratio: config.timeout_ratio,
        }
    }

    /// Whether neither read took more than `timeout_ratio` times the other.
    #[inline]
    pub fn is_consistent(&self, aperf_cycles: u64, mperf_cycles: u64) -> bool {
        let ratio = self.timeout_ratio;
        aperf_cycles <= ratio.saturating_mul(mperf_cycles)
            && mperf_cycles <= ratio.saturating_mul(aperf_cycles)
    }

    /// Whether no attempts remain.
    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }
}

/// Result of one timed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedRead {
    /// Register values read.
    pub sample: PerfSample,
    /// Cycles spent reading APERF.
    pub aperf_cycles: u64,
    /// Cycles spent reading MPERF.
    pub mperf_cycles: u64,
}

/// Per-core APERF/MPERF sampler.
///
/// Owns the handle table and the hardware primitives. Lifecycle:
///
/// ```ignore
/// use aperf_sampler::{topology, MsrSampler};
///
/// let mut sampler = MsrSampler::new();
/// sampler.capabilities().require_counters()?;
/// sampler.init(topology::max_cpu_count()?)?;
///
/// let sample = sampler.acquire_sample(0)?;
/// println!("aperf={} mperf={}", sample.aperf, sample.mperf);
///
/// sampler.teardown();
/// ```
///
/// `acquire_sample` takes `&self`, so a caller may sample distinct cores from
/// several threads at once (for example under `std::thread::scope`).
/// `init` and `teardown` take `&mut self` and therefore cannot overlap any
/// acquisition.
pub struct MsrSampler<D: RegisterDevice = MsrDevice, H: Hardware = NativeHardware> {
    table: HandleTable<D>,
    hardware: H,
    config: SamplerConfig,
}

#[cfg(unix)]
impl MsrSampler {
    /// Sampler over `/dev/cpu` on the executing processor.
    pub fn new() -> Self {
        Self {
            table: HandleTable::new(MsrDevice::new()),
            hardware: NativeHardware,
            config: SamplerConfig::default(),
        }
    }

    /// Sampler on the executing processor with custom settings.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `config` fails validation.
    pub fn with_config(config: SamplerConfig) -> Result<Self> {
        let device = MsrDevice::with_root(config.device_root.clone());
        Self::with_parts(device, NativeHardware, config)
    }
}

#[cfg(unix)]
impl Default for MsrSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: RegisterDevice, H: Hardware> MsrSampler<D, H> {
    /// Sampler over an arbitrary device and hardware implementation.
    ///
    /// `config.device_root` is ignored; `device` decides where handles come
    /// from.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `config` fails validation.
    pub fn with_parts(device: D, hardware: H, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            table: HandleTable::new(device),
            hardware,
            config,
        })
    }

    /// Allocate the handle table for `max_cpu_num` logical CPUs.
    ///
    /// Must be called before any read, and again after each
    /// [`teardown`](Self::teardown).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for a zero count or a table that is already
    /// allocated, [`Error::Allocation`] if memory runs out.
    pub fn init(&mut self, max_cpu_num: u32) -> Result<()> {
        self.table.allocate(max_cpu_num)
    }

    /// Close every handle and free the table. Safe to call repeatedly, or
    /// without a successful [`init`](Self::init).
    pub fn teardown(&mut self) {
        self.table.release();
    }

    /// Processor vendor matches the expected signature.
    pub fn detect_vendor(&self) -> bool {
        probe::detect_vendor(&self.hardware)
    }

    /// Raw family/model/stepping word.
    pub fn read_family_model(&self) -> u32 {
        probe::read_family_model(&self.hardware)
    }

    /// APERF/MPERF are advertised.
    pub fn supports_counter_feature(&self) -> bool {
        probe::supports_counter_feature(&self.hardware)
    }

    /// All probe results at once.
    pub fn capabilities(&self) -> ProcessorCapabilities {
        ProcessorCapabilities::detect(&self.hardware)
    }

    /// Active configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// The underlying handle table.
    pub fn table(&self) -> &HandleTable<D> {
        &self.table
    }

    /// Raw 64-bit read of register `offset` on `core`.
    pub fn read_register(&self, core: u32, offset: u64) -> Result<u64> {
        self.table.read_register(core, offset)
    }

    /// Read a named register on `core`.
    pub fn read_msr(&self, core: u32, msr: Msr) -> Result<u64> {
        self.table.read_msr(core, msr)
    }

    /// Read one consistent APERF/MPERF pair from `core`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] (or a table error such as [`Error::NotInitialized`])
    ///   as soon as any register read fails
    /// - [`Error::Timeout`] when every attempt was rejected
    pub fn acquire_sample(&self, core: u32) -> Result<PerfSample> {
        let mut budget = RetryBudget::new(&self.config);
        let mut state = AcquireState::Attempting(0);

        loop {
            state = match state {
                AcquireState::Attempting(n) => {
                    let outcome = self.timed_read(core);
                    AcquireState::Attempting(n).next(outcome, &mut budget)
                }
                AcquireState::Succeeded(sample) => return Ok(sample),
                AcquireState::Failed(err) => {
                    debug!("cpu {}: acquisition failed: {}", core, err);
                    return Err(err);
                }
                AcquireState::TimedOut => {
                    debug!(
                        "cpu {}: no consistent pair after {} attempts",
                        core, budget.attempts_made
                    );
                    return Err(Error::Timeout {
                        core,
                        attempts: budget.attempts_made,
                    });
                }
            };
        }
    }

    /// One attempt: priming read, then the two timed reads.
    #[inline]
    fn timed_read(&self, core: u32) -> Result<TimedRead> {
        self.table.read_msr(core, Msr::Aperf)?;

        let t0 = self.hardware.read_cycles();
        let aperf = self.table.read_msr(core, Msr::Aperf)?;
        let t1 = self.hardware.read_cycles();
        let mperf = self.table.read_msr(core, Msr::Mperf)?;
        let t2 = self.hardware.read_cycles();

        Ok(TimedRead {
            sample: PerfSample { aperf, mperf },
            aperf_cycles: t1.wrapping_sub(t0),
            mperf_cycles: t2.wrapping_sub(t1),
        })
    }
}

impl<D, H> std::fmt::Debug for MsrSampler<D, H>
where
    D: RegisterDevice + std::fmt::Debug,
    H: Hardware + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsrSampler")
            .field("table", &self.table)
            .field("hardware", &self.hardware)
            .field("config", &self.config)
            .finish()
    }
}
