//! Model-specific register access through per-core device nodes.
//!
//! The Linux `msr` driver exposes one node per logical CPU at
//! `/dev/cpu/<n>/msr`; an 8-byte `pread` at offset `N` returns register `N` of
//! that CPU. [`RegisterDevice`] abstracts "open the node for core `n`" and
//! [`RegisterHandle`] abstracts the positioned read, so the handle table can be
//! driven by an in-memory fake.

mod reader;
mod table;

pub use table::HandleTable;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default root of the per-core device nodes.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev/cpu";

/// Registers this crate knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Msr {
    /// IA32_MPERF, reference-clock cycles while in C0.
    Mperf,
    /// IA32_APERF, delivered-clock cycles while in C0.
    Aperf,
    /// MSR_FSB_FREQ, bus clock selector on Atom parts.
    FsbFreq,
    /// MSR_PLATFORM_INFO, bits 15:8 hold the base ratio.
    PlatformInfo,
    /// MSR_TURBO_RATIO_LIMIT.
    TurboRatioLimit,
    /// MSR_RAPL_POWER_UNIT.
    RaplPowerUnit,
    /// MSR_PKG_ENERGY_STATUS.
    PkgEnergyStatus,
}

impl Msr {
    /// Register address, used as the byte offset into the device node.
    pub const fn offset(self) -> u64 {
        match self {
            Msr::Mperf => 0xe7,
            Msr::Aperf => 0xe8,
            Msr::FsbFreq => 0xcd,
            Msr::PlatformInfo => 0xce,
            Msr::TurboRatioLimit => 0x1ad,
            Msr::RaplPowerUnit => 0x606,
            Msr::PkgEnergyStatus => 0x611,
        }
    }

    /// Short register name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Msr::Mperf => "IA32_MPERF",
            Msr::Aperf => "IA32_APERF",
            Msr::FsbFreq => "MSR_FSB_FREQ",
            Msr::PlatformInfo => "MSR_PLATFORM_INFO",
            Msr::TurboRatioLimit => "MSR_TURBO_RATIO_LIMIT",
            Msr::RaplPowerUnit => "MSR_RAPL_POWER_UNIT",
            Msr::PkgEnergyStatus => "MSR_PKG_ENERGY_STATUS",
        }
    }
}

impl std::fmt::Display for Msr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#x})", self.name(), self.offset())
    }
}

/// An open per-core register interface.
pub trait RegisterHandle {
    /// Positioned read into `buf` at byte `offset`. Returns the byte count.
    ///
    /// Must not depend on or move a shared file cursor.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

/// Opens per-core register interfaces.
pub trait RegisterDevice {
    /// Handle type produced by [`open`](Self::open).
    type Handle: RegisterHandle;

    /// Open the interface of logical CPU `core`.
    fn open(&self, core: u32) -> io::Result<Self::Handle>;
}

/// The kernel `msr` driver nodes under a root directory (`/dev/cpu` by
/// default).
#[derive(Debug, Clone)]
pub struct MsrDevice {
    root: PathBuf,
}

impl MsrDevice {
    /// Nodes under [`DEFAULT_DEVICE_ROOT`].
    pub fn new() -> Self {
        Self::with_root(DEFAULT_DEVICE_ROOT)
    }

    /// Nodes under `root`, laid out as `<root>/<core>/msr`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the nodes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the node for `core`.
    pub fn node_path(&self, core: u32) -> PathBuf {
        self.root.join(core.to_string()).join("msr")
    }
}

impl Default for MsrDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl RegisterDevice for MsrDevice {
    type Handle = File;

    fn open(&self, core: u32) -> io::Result<File> {
        File::open(self.node_path(core))
    }
}

#[cfg(unix)]
impl RegisterHandle for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

impl<D: RegisterDevice + ?Sized> RegisterDevice for &D {
    type Handle = D::Handle;

    fn open(&self, core: u32) -> io::Result<Self::Handle> {
        (**self).open(core)
    }
}
