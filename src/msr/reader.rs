//! Register reads through the handle table.

use super::{HandleTable, Msr, RegisterDevice, RegisterHandle};
use crate::error::{RegisterError, Result};

const MSR_WIDTH: usize = std::mem::size_of::<u64>();

impl<D: RegisterDevice> HandleTable<D> {
    /// Read the 64-bit register at `offset` on `core`.
    ///
    /// Opens the core's handle on first use. The eight bytes are interpreted in
    /// host byte order, which is how the `msr` driver hands them out.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`](crate::Error::NotInitialized),
    /// [`Error::CoreOutOfRange`](crate::Error::CoreOutOfRange) and
    /// [`RegisterError::Open`] from the lazy open, plus
    /// [`RegisterError::Read`] when the read fails and
    /// [`RegisterError::ShortRead`] when fewer than eight bytes arrive.
    #[inline]
    pub fn read_register(&self, core: u32, offset: u64) -> Result<u64> {
        let handle = self.get_handle(core)?;

        let mut buf = [0u8; MSR_WIDTH];
        let read = handle
            .read_at(&mut buf, offset)
            .map_err(|source| RegisterError::Read {
                core,
                offset,
                source,
            })?;
        if read != MSR_WIDTH {
            return Err(RegisterError::ShortRead { core, offset, read }.into());
        }

        Ok(u64::from_ne_bytes(buf))
    }

    /// Read a named register on `core`.
    #[inline]
    pub fn read_msr(&self, core: u32, msr: Msr) -> Result<u64> {
        self.read_register(core, msr.offset())
    }
}
