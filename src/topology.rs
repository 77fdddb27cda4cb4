//! Logical CPU count for sizing the handle table.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

const PRESENT_PATH: &str = "/sys/devices/system/cpu/present";

/// Number of table slots needed to cover every present logical CPU.
///
/// Reads the kernel's present-CPU list and returns the highest index plus one,
/// so sparse numbering still gets a slot per index. Falls back to
/// `sysconf(_SC_NPROCESSORS_CONF)` when the list is unavailable.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if neither source yields a positive count.
pub fn max_cpu_count() -> Result<u32> {
    if let Some(count) = count_from_file(Path::new(PRESENT_PATH)) {
        return Ok(count);
    }

    let count = sysconf_count();
    debug!("cpu list unavailable, sysconf reports {} cpus", count);
    if count == 0 {
        return Err(Error::InvalidArgument(
            "could not determine logical cpu count".to_string(),
        ));
    }
    Ok(count)
}

fn count_from_file(path: &Path) -> Option<u32> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_cpu_list(&contents)
}

#[cfg(unix)]
fn sysconf_count() -> u32 {
    // SAFETY: sysconf has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    u32::try_from(n).unwrap_or(0)
}

#[cfg(not(unix))]
fn sysconf_count() -> u32 {
    std::thread::available_parallelism().map_or(0, |n| n.get() as u32)
}

/// Parse a kernel CPU list (`0-7`, `0,2-5,8`) into highest index + 1.
///
/// Returns `None` for empty or malformed input.
pub fn parse_cpu_list(list: &str) -> Option<u32> {
    let list = list.trim();
    if list.is_empty() {
        return None;
    }

    let mut highest = None;
    for part in list.split(',') {
        let part = part.trim();
        let end = match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                end
            }
            None => part.parse().ok()?,
        };
        highest = highest.max(Some(end));
    }

    highest.and_then(|h: u32| h.checked_add(1))
}
