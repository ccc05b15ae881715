pub(crate) mod entry;

use crate::locks::SpinLockIrq;
use entry::{Entry, EntryFlags};

pub const PAGE_SIZE: u32 = 4096;
pub const PAGE_ENTRY_COUNT: usize = 1024;

// physical base of the 4MB kernel page, directory slot 1
const KERNEL_PAGE_BASE: u32 = 1 << 22;

/// A page directory or page table: 1024 entries, page-aligned as the
/// processor requires.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [Entry; PAGE_ENTRY_COUNT],
}

impl PageTable {
    pub const fn new() -> Self {
        Self {
            entries: [Entry::zero(); PAGE_ENTRY_COUNT],
        }
    }

    pub fn zero(&mut self) {
        for entry in &mut self.entries {
            entry.set_zero();
        }
    }
}

impl core::ops::Index<usize> for PageTable {
    type Output = Entry;
    fn index(&self, index: usize) -> &Entry {
        &self.entries[index]
    }
}

impl core::ops::IndexMut<usize> for PageTable {
    fn index_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }
}

pub struct BootTables {
    pub dir: PageTable,
    pub table: PageTable,
}

// The boot mapping, statically allocated and mutated only under the lock so
// a timer interrupt can never observe a half-built table.
pub(crate) static BOOT_TABLES: SpinLockIrq<BootTables> = SpinLockIrq::new(BootTables {
    dir: PageTable::new(),
    table: PageTable::new(),
});

/// Build the boot mapping: directory slot 1 is a writable 4MB page covering
/// the kernel image, slot 0 points at `table` which identity-maps the low
/// 4MB in 4KB pages. Table index 0 is left not-present so null dereferences
/// fault instead of silently succeeding.
pub fn populate_boot_tables(dir: &mut PageTable, table: &mut PageTable, table_phys: u32) {
    dir.zero();
    table.zero();

    dir[1].set_huge(KERNEL_PAGE_BASE, EntryFlags::PRESENT | EntryFlags::WRITABLE);
    // the low 4MB also hold user program images and stacks
    dir[0].set(
        table_phys,
        EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER_ACCESSIBLE,
    );

    // IMPORTANT: starts at 1, never 0. Index 0 is the null guard.
    for i in 1..PAGE_ENTRY_COUNT {
        table[i].set(
            i as u32 * PAGE_SIZE,
            EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER_ACCESSIBLE,
        );
    }
}

#[cfg(target_arch = "x86")]
mod enable {
    use super::*;
    use core::ptr::addr_of;

    /// Install and switch on the boot mapping. The whole sequence holds the
    /// irq-saving lock: from here on CR3 points at the directory, so a
    /// half-populated view must never be observable.
    pub(crate) unsafe fn enable_basic_paging() {
        let mut guard = BOOT_TABLES.lock();
        let BootTables { dir, table } = &mut *guard;

        // identity space: the statics' virtual addresses are their physical ones
        let dir_phys = addr_of!(*dir) as u32;
        let table_phys = addr_of!(*table) as u32;

        write_cr3(dir_phys);
        populate_boot_tables(dir, table, table_phys);
        enable_paging();
    }

    unsafe fn write_cr3(dir_phys: u32) {
        core::arch::asm!("mov cr3, {0}", in(reg) dir_phys, options(nostack));
    }

    unsafe fn enable_paging() {
        // CR4.PSE for the 4MB kernel page, then CR0.PG last
        core::arch::asm!(
            "mov {tmp}, cr4",
            "or {tmp}, 0x10",
            "mov cr4, {tmp}",
            "mov {tmp}, cr0",
            "or {tmp}, 0x80000000",
            "mov cr0, {tmp}",
            tmp = out(reg) _,
            options(nostack),
        );
    }
}

#[cfg(target_arch = "x86")]
pub(crate) use enable::enable_basic_paging;

#[cfg(test)]
mod tests {
    use super::*;

    fn built() -> Box<BootTables> {
        let mut tables = Box::new(BootTables {
            dir: PageTable::new(),
            table: PageTable::new(),
        });
        let BootTables { dir, table } = &mut *tables;
        populate_boot_tables(dir, table, 0x0009_d000);
        tables
    }

    #[test]
    fn table_index_zero_is_never_present() {
        let tables = built();
        assert!(!tables.table[0].is_present());
    }

    #[test]
    fn low_region_is_identity_mapped() {
        let tables = built();
        for i in 1..PAGE_ENTRY_COUNT {
            let entry = tables.table[i];
            assert!(entry.is_present());
            assert!(entry
                .flags()
                .contains(EntryFlags::WRITABLE | EntryFlags::USER_ACCESSIBLE));
            assert_eq!(entry.addr(), (i as u32) << 12);
        }
    }

    #[test]
    fn directory_slot_one_is_the_kernel_4mb_page() {
        let tables = built();
        let entry = tables.dir[1];
        assert!(entry.is_present());
        assert!(entry.flags().contains(EntryFlags::HUGE_PAGE));
        // kernel page stays supervisor-only
        assert!(!entry.flags().contains(EntryFlags::USER_ACCESSIBLE));
        assert_eq!(entry.addr(), 1 << 22);
    }

    #[test]
    fn directory_slot_zero_points_at_the_table() {
        let tables = built();
        let entry = tables.dir[0];
        assert!(entry.is_present());
        assert!(!entry.flags().contains(EntryFlags::HUGE_PAGE));
        assert_eq!(entry.addr(), 0x0009_d000);
    }

    #[test]
    fn remaining_directory_slots_stay_unmapped() {
        let tables = built();
        for i in 2..PAGE_ENTRY_COUNT {
            assert!(!tables.dir[i].is_present());
        }
    }
}
