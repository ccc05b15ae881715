pub(crate) mod gdt;
pub(crate) mod interrupts;
pub(crate) mod paging;
pub(crate) mod pic;
pub(crate) mod pit;
pub(crate) mod port;
pub(crate) mod process;
pub(crate) mod syscall;

use bitflags::bitflags;

bitflags! {
    // EFLAGS bits the core cares about. A fresh thread context must have
    // TRAP/VM86/NESTED_TASK clear and INTERRUPT plus IOPL set, or the first
    // iretd into it lands the CPU in a state we never meant to build.
    pub struct EFlags: u32 {
        const CARRY       = 1 << 0;
        const TRAP        = 1 << 8;
        const INTERRUPT   = 1 << 9;
        const IOPL        = 0b11 << 12;
        const NESTED_TASK = 1 << 14;
        const VM86        = 1 << 17;
    }
}

#[inline]
pub(crate) fn is_int_enabled() -> bool {
    #[cfg(target_arch = "x86")]
    {
        let eflags: u32;
        unsafe {
            core::arch::asm!("pushfd", "pop {}", out(reg) eflags);
        }
        eflags & EFlags::INTERRUPT.bits() != 0
    }
    // host builds have no interrupt flag to read
    #[cfg(not(target_arch = "x86"))]
    {
        false
    }
}

#[inline]
pub(crate) fn enable_interrupts() {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack));
    }
}

#[inline]
pub(crate) fn disable_interrupts() {
    #[cfg(target_arch = "x86")]
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
}

/// Park the CPU. Terminal state for unrecoverable errors.
#[cfg(target_arch = "x86")]
pub(crate) fn halt_loop() -> ! {
    loop {
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack));
        }
    }
}
