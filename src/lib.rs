//! # aperf-sampler
//!
//! Read consistent per-core APERF/MPERF pairs for CPU frequency telemetry.
//!
//! APERF ticks at the delivered core clock and MPERF at a fixed reference
//! clock; the ratio of their deltas between two samples is the effective
//! frequency scaling. This crate only acquires the raw pairs. It:
//!
//! - probes the processor for the vendor signature and the APERF/MPERF feature
//!   bit
//! - keeps one lazily opened `/dev/cpu/<n>/msr` handle per core
//! - times each register read with the TSC and rejects pairs whose reads were
//!   split by preemption, retrying a bounded number of times
//!
//! Scheduling, delta computation and export belong to the caller.
//!
//! ## Quick Start
//!
//! ```ignore
//! use aperf_sampler::{topology, MsrSampler};
//!
//! let mut sampler = MsrSampler::new();
//! sampler.capabilities().require_counters()?;
//! sampler.init(topology::max_cpu_count()?)?;
//!
//! match sampler.acquire_sample(0) {
//!     Ok(s) => println!("aperf={} mperf={}", s.aperf, s.mperf),
//!     Err(e) if e.is_timeout() => println!("telemetry gap"),
//!     Err(e) => return Err(e),
//! }
//!
//! sampler.teardown();
//! ```
//!
//! Reading the `msr` nodes needs the `msr` kernel module and `CAP_SYS_RAWIO`
//! (or root); setting that up is the caller's job.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod sampler;
mod types;

pub mod hardware;
pub mod msr;
pub mod output;
pub mod probe;
pub mod topology;

pub use config::SamplerConfig;
pub use error::{Error, RegisterError, Result};
pub use hardware::{CpuidResult, Hardware, NativeHardware};
pub use msr::{HandleTable, Msr, MsrDevice, RegisterDevice, RegisterHandle};
pub use sampler::{AcquireState, MsrSampler, RetryBudget, TimedRead};
pub use types::{FamilyModel, PerfSample, ProcessorCapabilities};

/// Whether the executing processor reports the `GenuineIntel` signature.
pub fn detect_vendor() -> bool {
    probe::detect_vendor(&NativeHardware)
}

/// Raw family/model/stepping word of the executing processor.
pub fn read_family_model() -> u32 {
    probe::read_family_model(&NativeHardware)
}

/// Whether the executing processor advertises APERF/MPERF.
pub fn supports_counter_feature() -> bool {
    probe::supports_counter_feature(&NativeHardware)
}

/// All probe results for the executing processor.
pub fn capabilities() -> ProcessorCapabilities {
    ProcessorCapabilities::detect(&NativeHardware)
}
