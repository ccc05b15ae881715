use crate::locks::SpinLockIrq;

// Selector layout of the GDT the boot stub hands us. Slots 1..=4 (flat code
// and data for both rings) are filled by boot.S; the LDT and TSS slots are
// written here, once, during `init`.
pub(crate) const KERNEL_CS_SEL: u16 = 0x08;
pub(crate) const KERNEL_DS_SEL: u16 = 0x10;
pub(crate) const USER_CS_SEL: u16 = 0x18 | 0x3;
pub(crate) const USER_DS_SEL: u16 = 0x20 | 0x3;
pub(crate) const KERNEL_TSS_SEL: u16 = 0x28;
pub(crate) const KERNEL_LDT_SEL: u16 = 0x30;

const LDT_ENTRIES: usize = 4;

// System descriptor types (S = 0).
const TYPE_LDT: u8 = 0x2;
const TYPE_TSS_32_AVAIL: u8 = 0x9;

// Kernel stack used between `ltr` and the first context switch; top of the
// 4MB kernel page.
const BOOT_ESP0: u32 = 0x0080_0000;

/// One GDT/LDT entry, kept as the packed 8-byte record the processor reads.
/// Bit ranges, low qword to high: limit 15:0, base 15:0, base 23:16,
/// type (4 bits), S, DPL (2 bits), P, limit 19:16, AVL, reserved, D/B, G,
/// base 31:24.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct SegmentDescriptor(u64);

impl SegmentDescriptor {
    pub(crate) const NULL: Self = Self(0);

    /// Pure construction of a system-segment descriptor (LDT, TSS). Byte
    /// granularity; `opsize32` drives the D/B bit.
    pub(crate) fn system(base: u32, limit: u32, seg_type: u8, dpl: u8, opsize32: bool) -> Self {
        assert!(seg_type < 0x10);
        assert!(dpl < 4);
        assert!(limit < (1 << 20));

        let mut raw = 0u64;
        raw |= (limit & 0xffff) as u64;
        raw |= ((base & 0xffff) as u64) << 16;
        raw |= (((base >> 16) & 0xff) as u64) << 32;
        raw |= (seg_type as u64) << 40;
        // S = 0: system segment
        raw |= (dpl as u64) << 45;
        // present
        raw |= 1 << 47;
        raw |= (((limit >> 16) & 0xf) as u64) << 48;
        raw |= (opsize32 as u64) << 54;
        // G = 0: byte granularity
        raw |= (((base >> 24) & 0xff) as u64) << 56;
        Self(raw)
    }

    pub(crate) fn base(&self) -> u32 {
        ((self.0 >> 16) & 0xffff) as u32
            | (((self.0 >> 32) & 0xff) as u32) << 16
            | (((self.0 >> 56) & 0xff) as u32) << 24
    }

    pub(crate) fn limit(&self) -> u32 {
        (self.0 & 0xffff) as u32 | (((self.0 >> 48) & 0xf) as u32) << 16
    }

    pub(crate) fn seg_type(&self) -> u8 {
        ((self.0 >> 40) & 0xf) as u8
    }

    pub(crate) fn dpl(&self) -> u8 {
        ((self.0 >> 45) & 0b11) as u8
    }

    pub(crate) fn present(&self) -> bool {
        self.0 >> 47 & 1 != 0
    }
}

pub(crate) fn ldt_descriptor(base: u32, limit: u32) -> SegmentDescriptor {
    SegmentDescriptor::system(base, limit, TYPE_LDT, 0, true)
}

pub(crate) fn tss_descriptor(base: u32, limit: u32) -> SegmentDescriptor {
    // 16-bit opsize on the TSS descriptor, matching the boot protocol
    SegmentDescriptor::system(base, limit, TYPE_TSS_32_AVAIL, 0, false)
}

/// 32-bit hardware task state segment. Only three fields matter after boot:
/// `ss0`/`esp0` locate the ring-0 stack on a privilege-raising interrupt and
/// `ldt_selector` names our LDT. Everything in between is task-switch state
/// this kernel never uses.
#[repr(C, packed)]
pub(crate) struct TaskStateSegment {
    link: u32,
    pub(crate) esp0: u32,
    pub(crate) ss0: u32,
    // esp1/ss1, esp2/ss2, cr3, eip, eflags, the general registers and the
    // segment registers: present for the hardware, never read by us
    unused: [u32; 21],
    pub(crate) ldt_selector: u32,
    trap: u16,
    pub(crate) iomap_base: u16,
}

impl TaskStateSegment {
    pub(crate) const fn new() -> Self {
        Self {
            link: 0,
            esp0: 0,
            ss0: 0,
            unused: [0; 21],
            ldt_selector: 0,
            trap: 0,
            iomap_base: 0,
        }
    }
}

// Process-wide singletons, constructed empty and written exactly once by
// `init`. Post-boot, the one legal mutation is `set_kernel_stack`.
pub(crate) static TSS: SpinLockIrq<TaskStateSegment> = SpinLockIrq::new(TaskStateSegment::new());
static LDT: [SegmentDescriptor; LDT_ENTRIES] = [SegmentDescriptor::NULL; LDT_ENTRIES];

/// The single post-boot TSS mutation point: called on every context switch so
/// the next privilege-raising interrupt lands on the chosen thread's kernel
/// stack.
pub(crate) fn set_kernel_stack(esp0: usize) {
    TSS.lock().esp0 = esp0 as u32;
}

#[cfg(target_arch = "x86")]
mod load {
    use super::*;
    use core::mem::size_of;
    use core::ptr::addr_of;

    extern "C" {
        // flat GDT provided by the boot stub; slots 5 and 6 are reserved
        // for the TSS and LDT descriptors built here
        static mut boot_gdt: [SegmentDescriptor; 8];
    }

    /// Build the LDT and TSS descriptors, install them in the GDT and load
    /// the selectors. Malformed descriptors fault at `lldt`/`ltr`; there is
    /// no software error path at this stage.
    pub(crate) unsafe fn init() {
        {
            let mut tss = TSS.lock();
            tss.ss0 = KERNEL_DS_SEL as u32;
            tss.esp0 = BOOT_ESP0;
            tss.ldt_selector = KERNEL_LDT_SEL as u32;
            // no I/O permission bitmap: point past the segment limit
            tss.iomap_base = size_of::<TaskStateSegment>() as u16;
        }

        let ldt_base = addr_of!(LDT) as u32;
        let ldt_limit = (size_of::<[SegmentDescriptor; LDT_ENTRIES]>() - 1) as u32;
        let tss_base = TSS.data_ptr() as u32;
        let tss_limit = (size_of::<TaskStateSegment>() - 1) as u32;

        let gdt = &mut *core::ptr::addr_of_mut!(boot_gdt);
        gdt[(KERNEL_TSS_SEL >> 3) as usize] = tss_descriptor(tss_base, tss_limit);
        gdt[(KERNEL_LDT_SEL >> 3) as usize] = ldt_descriptor(ldt_base, ldt_limit);

        lldt(KERNEL_LDT_SEL);
        ltr(KERNEL_TSS_SEL);
    }

    unsafe fn lldt(selector: u16) {
        core::arch::asm!("lldt {0:x}", in(reg) selector, options(nostack));
    }

    // Marks the TSS busy; must run exactly once. Reloading the task register
    // with a busy TSS selector is a general-protection fault, which is why
    // context switches only ever rewrite `esp0`.
    unsafe fn ltr(selector: u16) {
        core::arch::asm!("ltr {0:x}", in(reg) selector, options(nostack));
    }
}

#[cfg(target_arch = "x86")]
pub(crate) use load::init;
