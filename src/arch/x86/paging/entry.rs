use bitflags::bitflags;

bitflags! {
    pub struct EntryFlags: u32 {
        const PRESENT         = 1 << 0;
        const WRITABLE        = 1 << 1;
        const USER_ACCESSIBLE = 1 << 2;
        const WRITE_THROUGH   = 1 << 3;
        const NO_CACHE        = 1 << 4;
        const ACCESSED        = 1 << 5;
        const DIRTY           = 1 << 6;
        // page size bit: a directory entry mapping a 4MB page directly
        const HUGE_PAGE       = 1 << 7;
        const GLOBAL          = 1 << 8;
    }
}

const ADDR_MASK_4KB: u32 = 0xffff_f000;
const ADDR_MASK_4MB: u32 = 0xffc0_0000;

/// One 32-bit page-directory or page-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Entry(u32);

impl Entry {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn set_zero(&mut self) {
        self.0 = 0;
    }

    pub fn is_present(&self) -> bool {
        self.flags().contains(EntryFlags::PRESENT)
    }

    pub fn flags(&self) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.0)
    }

    /// Point this entry at a 4KB-aligned frame (or page table).
    pub fn set(&mut self, phys: u32, flags: EntryFlags) {
        assert_eq!(phys & !ADDR_MASK_4KB, 0);
        self.0 = phys | flags.bits();
    }

    /// Point this entry at a 4MB page; forces the page-size bit.
    pub fn set_huge(&mut self, phys: u32, flags: EntryFlags) {
        assert_eq!(phys & !ADDR_MASK_4MB, 0);
        self.0 = phys | (flags | EntryFlags::HUGE_PAGE).bits();
    }

    pub fn addr(&self) -> u32 {
        if self.flags().contains(EntryFlags::HUGE_PAGE) {
            self.0 & ADDR_MASK_4MB
        } else {
            self.0 & ADDR_MASK_4KB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_entry_is_not_present() {
        assert!(!Entry::zero().is_present());
    }

    #[test]
    fn set_records_address_and_flags() {
        let mut entry = Entry::zero();
        entry.set(0x1f_3000, EntryFlags::PRESENT | EntryFlags::WRITABLE);
        assert_eq!(entry.addr(), 0x1f_3000);
        assert!(entry.is_present());
        assert!(entry.flags().contains(EntryFlags::WRITABLE));
        assert!(!entry.flags().contains(EntryFlags::USER_ACCESSIBLE));
    }

    #[test]
    fn huge_entry_masks_to_4mb_boundary() {
        let mut entry = Entry::zero();
        entry.set_huge(1 << 22, EntryFlags::PRESENT | EntryFlags::WRITABLE);
        assert_eq!(entry.addr(), 1 << 22);
        assert!(entry.flags().contains(EntryFlags::HUGE_PAGE));
    }

    #[test]
    #[should_panic]
    fn unaligned_frame_is_rejected() {
        Entry::zero().set(0x1234, EntryFlags::PRESENT);
    }
}
