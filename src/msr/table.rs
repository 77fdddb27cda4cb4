//! Per-core handle table.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::RegisterDevice;
use crate::error::{Error, RegisterError, Result};

type Slot<H> = Mutex<Option<Arc<H>>>;

/// Owned mapping from core index to a lazily opened register handle.
///
/// Each slot holds at most one handle. Slots fill on first access and are only
/// emptied all together by [`release`](Self::release) (or on drop). Lookups
/// take `&self`, so different cores can be read from different threads;
/// allocation and release take `&mut self`, which keeps them from overlapping
/// any read.
pub struct HandleTable<D: RegisterDevice> {
    device: D,
    slots: Option<Vec<Slot<D::Handle>>>,
}

impl<D: RegisterDevice> HandleTable<D> {
    /// Unallocated table opening handles through `device`.
    pub fn new(device: D) -> Self {
        Self {
            device,
            slots: None,
        }
    }

    /// The device handles are opened through.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Allocate `max_cpu_num` empty slots.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `max_cpu_num` is zero or the table is
    ///   already allocated
    /// - [`Error::Allocation`] if the slot array cannot be reserved
    pub fn allocate(&mut self, max_cpu_num: u32) -> Result<()> {
        if max_cpu_num == 0 {
            return Err(Error::InvalidArgument(
                "max_cpu_num must be positive".to_string(),
            ));
        }
        if self.slots.is_some() {
            return Err(Error::InvalidArgument(
                "handle table is already allocated".to_string(),
            ));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(max_cpu_num as usize)
            .map_err(|_| Error::Allocation { slots: max_cpu_num })?;
        slots.resize_with(max_cpu_num as usize, || Mutex::new(None));

        debug!("allocated msr handle table for {} cpus", max_cpu_num);
        self.slots = Some(slots);
        Ok(())
    }

    /// Close every open handle and free the table. No-op when unallocated.
    pub fn release(&mut self) {
        if let Some(slots) = self.slots.take() {
            let closed = slots
                .into_iter()
                .filter_map(|slot| slot.into_inner().unwrap_or_else(PoisonError::into_inner))
                .count();
            debug!("released msr handle table, closed {} handles", closed);
        }
    }

    /// Whether [`allocate`](Self::allocate) has succeeded since the last release.
    pub fn is_allocated(&self) -> bool {
        self.slots.is_some()
    }

    /// Slot count fixed at allocation, 0 when unallocated.
    pub fn max_cpu_num(&self) -> u32 {
        self.slots.as_ref().map_or(0, |s| s.len() as u32)
    }

    /// Number of slots currently holding an open handle.
    pub fn open_count(&self) -> usize {
        self.slots.as_ref().map_or(0, |slots| {
            slots.iter().filter(|slot| lock(slot).is_some()).count()
        })
    }

    /// Cached handle for `core`, opening it on first use.
    ///
    /// A failed open leaves the slot empty so the next call tries again.
    ///
    /// Handles never leave the crate, so [`release`](Self::release) closes
    /// every one of them and a core never has two open at once.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] before allocation
    /// - [`Error::CoreOutOfRange`] if `core >= max_cpu_num`
    /// - [`RegisterError::Open`] if the device refuses the open
    pub(crate) fn get_handle(&self, core: u32) -> Result<Arc<D::Handle>> {
        let slots = self.slots.as_ref().ok_or(Error::NotInitialized)?;
        let slot = slots.get(core as usize).ok_or(Error::CoreOutOfRange {
            core,
            max_cpu_num: slots.len() as u32,
        })?;

        // Held across the open so two callers cannot both open the same core.
        let mut entry = lock(slot);
        if let Some(handle) = entry.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = self
            .device
            .open(core)
            .map_err(|source| RegisterError::Open { core, source })?;
        debug!("cpu {}: opened msr handle", core);

        let handle = Arc::new(handle);
        *entry = Some(Arc::clone(&handle));
        Ok(handle)
    }
}

impl<D: RegisterDevice + std::fmt::Debug> std::fmt::Debug for HandleTable<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("device", &self.device)
            .field("max_cpu_num", &self.max_cpu_num())
            .field("open", &self.open_count())
            .finish()
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding a slot cannot leave it half-written.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
