// This file is part of novuspack.
//
// novuspack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// novuspack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with novuspack.  If not, see <https://www.gnu.org/licenses/>.

/// Bytes of memory currently available to the process, if the platform can
/// tell. Advisory only: the value may be stale by the time it is used.
///
/// On Linux this is `MemAvailable` from `/proc/meminfo`, which counts
/// reclaimable page cache. Kernels without that line fall back to
/// `sysinfo`, whose free plus buffer RAM leaves the page cache out and so
/// undercounts.
#[cfg(target_os = "linux")]
pub fn available_memory() -> Option<u64> {
    match std::fs::read_to_string("/proc/meminfo") {
        Ok(meminfo) => {
            if let Some(available) = parse_mem_available(&meminfo) {
                return Some(available);
            }
            log::debug!("/proc/meminfo has no MemAvailable line, using sysinfo()");
        },
        Err(error) => {
            log::debug!("reading /proc/meminfo: {}", error);
        }
    }

    sysinfo_free()
}

#[cfg(target_os = "linux")]
fn sysinfo_free() -> Option<u64> {
    let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };

    let result = unsafe { libc::sysinfo(&mut info) };
    if result != 0 {
        log::warn!("sysinfo() failed: {}", std::io::Error::last_os_error());
        return None;
    }

    let unit = if info.mem_unit == 0 { 1 } else { info.mem_unit as u64 };
    let free = (info.freeram as u64).saturating_add(info.bufferram as u64);

    Some(free.saturating_mul(unit))
}

/// Extracts `MemAvailable` in bytes from `/proc/meminfo` text.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|line| line.starts_with("MemAvailable:"))?;
    let mut fields = line["MemAvailable:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;

    match fields.next() {
        Some("kB") => Some(value.saturating_mul(1024)),
        None => Some(value),
        Some(_) => None,
    }
}

#[cfg(not(target_os = "linux"))]
pub fn available_memory() -> Option<u64> {
    log::warn!("available memory is unknown on this platform");
    None
}
