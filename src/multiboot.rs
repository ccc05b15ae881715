//! Multiboot 1 boot information, as GRUB leaves it in memory.

use core::ptr;

/// Value the bootloader must hand over in EAX.
pub(crate) const BOOTLOADER_MAGIC: u32 = 0x2bad_b002;

// Leading fixed part of the info record. Later fields exist only when their
// flag bit says so, which is why the accessors check `flags` first.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
struct RawInfo {
    flags: u32,
    mem_lower: u32,
    mem_upper: u32,
    boot_device: u32,
    cmdline: u32,
    mods_count: u32,
    mods_addr: u32,
}

const FLAG_MEM: u32 = 1 << 0;
const FLAG_CMDLINE: u32 = 1 << 2;
const FLAG_MODS: u32 = 1 << 3;

pub(crate) struct MultibootInfo {
    raw: RawInfo,
}

impl MultibootInfo {
    /// Read the info record at `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must point at a multiboot info record, which the magic check
    /// at entry establishes. The record is not 8-byte aligned in general.
    pub(crate) unsafe fn new(addr: usize) -> Self {
        Self {
            raw: ptr::read_unaligned(addr as *const RawInfo),
        }
    }

    /// Conventional (below 1MB) and upper memory in KB, when reported.
    pub(crate) fn mem_bounds(&self) -> Option<(u32, u32)> {
        (self.raw.flags & FLAG_MEM != 0).then(|| (self.raw.mem_lower, self.raw.mem_upper))
    }

    pub(crate) fn cmdline_addr(&self) -> Option<u32> {
        (self.raw.flags & FLAG_CMDLINE != 0).then(|| self.raw.cmdline)
    }

    pub(crate) fn module_count(&self) -> u32 {
        if self.raw.flags & FLAG_MODS != 0 {
            self.raw.mods_count
        } else {
            0
        }
    }
}

pub(crate) fn log_boot_info(info: &MultibootInfo) {
    match info.mem_bounds() {
        Some((lower, upper)) => log::info!("mem: {}KB lower, {}KB upper", lower, upper),
        None => log::warn!("bootloader reported no memory bounds"),
    }
    if let Some(addr) = info.cmdline_addr() {
        log::info!("cmdline @ {:#x}", addr);
    }
    log::info!("{} boot modules", info.module_count());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_from(words: [u32; 7]) -> MultibootInfo {
        let mut bytes = [0u8; 28];
        for (i, w) in words.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        unsafe { MultibootInfo::new(bytes.as_ptr() as usize) }
    }

    #[test]
    fn flagged_fields_are_visible() {
        let info = info_from([
            FLAG_MEM | FLAG_MODS,
            640,
            0x7_fc00,
            0,
            0xdead,
            2,
            0x0010_0000,
        ]);
        assert_eq!(info.mem_bounds(), Some((640, 0x7_fc00)));
        assert_eq!(info.module_count(), 2);
        // cmdline bit is off, the field's content is garbage
        assert_eq!(info.cmdline_addr(), None);
    }

    #[test]
    fn unflagged_fields_are_hidden() {
        let info = info_from([0, 640, 0x7_fc00, 0, 0, 9, 0]);
        assert_eq!(info.mem_bounds(), None);
        assert_eq!(info.module_count(), 0);
    }
}
