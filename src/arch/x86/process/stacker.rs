//! First-launch context construction.
//!
//! A thread that has never run gets a hand-built canonical frame at the top
//! of its kernel stack, laid out exactly as the interrupt entry path would
//! have left it. The restore sequence then cannot tell a first launch from
//! a resume.

use crate::arch::x86::interrupts::entry::PushedRegs;
use crate::arch::x86::EFlags;

/// Return-slot value for a context that is not returning from a syscall.
pub(crate) const NO_SYSCALL_RESULT: u32 = -1i32 as u32;

/// Downward cursor over a kernel stack, mirroring hardware push order.
pub(crate) struct Stacker {
    sp: usize,
}

impl Stacker {
    /// # Safety
    ///
    /// `top` must be one past the end of writable memory owned by the
    /// caller; every push walks the cursor down into it.
    pub(crate) unsafe fn new(top: usize) -> Self {
        Self { sp: top & !0b11 }
    }

    /// # Safety
    ///
    /// The cursor must still be inside the memory `new` was given.
    pub(crate) unsafe fn push(&mut self, value: u32) {
        self.sp -= core::mem::size_of::<u32>();
        (self.sp as *mut u32).write(value);
    }

    /// PUSHAD order: EAX first, EDI last (lowest address).
    unsafe fn push_registers(&mut self, regs: &PushedRegs) {
        self.push(regs.eax);
        self.push(regs.ecx);
        self.push(regs.edx);
        self.push(regs.ebx);
        self.push(regs.esp);
        self.push(regs.ebp);
        self.push(regs.esi);
        self.push(regs.edi);
    }

    pub(crate) fn esp(&self) -> usize {
        self.sp
    }
}

/// Everything the first launch of a thread needs pinned into its frame.
pub(crate) struct InitialContext {
    pub entry: usize,
    pub code_selector: u16,
    pub eflags_seed: u32,
    /// `Some((ss, esp))` for a ring-3 thread; the iret frame then carries
    /// the user stack. `None` launches at ring 0 on the kernel stack.
    pub user_stack: Option<(u16, u32)>,
}

/// Sanitize the flags a new context starts with: no single-stepping, no
/// vm86, no nested-task linkage; interrupts on, IOPL 3. Every other bit of
/// the seed, arithmetic flags included, comes through untouched.
pub(crate) fn initial_eflags(seed: u32) -> u32 {
    let cleared = (EFlags::TRAP | EFlags::VM86 | EFlags::NESTED_TASK).bits();
    let forced = (EFlags::INTERRUPT | EFlags::IOPL).bits();
    (seed & !cleared) | forced
}

/// Build the launch frame below `kstack_top` and return the `esp0` the
/// restore sequence starts from.
///
/// # Safety
///
/// `kstack_top` must be one past the end of a writable kernel stack with
/// room for the frame.
pub(crate) unsafe fn build_initial_context(kstack_top: usize, ctx: &InitialContext) -> usize {
    let mut cursor = Stacker::new(kstack_top);

    if let Some((ss, user_esp)) = ctx.user_stack {
        cursor.push(ss as u32);
        cursor.push(user_esp);
    }
    cursor.push(initial_eflags(ctx.eflags_seed));
    cursor.push(ctx.code_selector as u32);
    cursor.push(ctx.entry as u32);

    cursor.push(NO_SYSCALL_RESULT);
    cursor.push_registers(&PushedRegs {
        eax: NO_SYSCALL_RESULT,
        esp: cursor.esp() as u32,
        ..PushedRegs::default()
    });

    cursor.esp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::x86::gdt::{KERNEL_CS_SEL, USER_CS_SEL, USER_DS_SEL};
    use crate::arch::x86::interrupts::entry::SavedContext;

    fn read_frame(esp0: usize) -> SavedContext {
        unsafe { (esp0 as *const SavedContext).read() }
    }

    #[test]
    fn kernel_context_round_trips() {
        let mut stack = [0u8; 128];
        let top = stack.as_mut_ptr() as usize + stack.len();
        let ctx = InitialContext {
            entry: 0x0010_0000,
            code_selector: KERNEL_CS_SEL,
            eflags_seed: 0,
            user_stack: None,
        };
        let esp0 = unsafe { build_initial_context(top, &ctx) };
        let frame = read_frame(esp0);

        assert_eq!(frame.eip, 0x0010_0000);
        assert_eq!(frame.cs, KERNEL_CS_SEL as u32);
        assert_eq!(frame.ret_eax, NO_SYSCALL_RESULT);
        assert_eq!(frame.regs.eax, NO_SYSCALL_RESULT);
        assert_eq!(frame.regs.ebp, 0);
        // 12 words of frame below the (aligned) top
        assert_eq!(esp0, (top & !0b11) - 12 * 4);
    }

    #[test]
    fn user_context_carries_the_ring3_stack() {
        let mut stack = [0u8; 128];
        let top = stack.as_mut_ptr() as usize + stack.len();
        let ctx = InitialContext {
            entry: 0x0030_0000,
            code_selector: USER_CS_SEL,
            eflags_seed: 0,
            user_stack: Some((USER_DS_SEL, 0x0040_0000)),
        };
        let esp0 = unsafe { build_initial_context(top, &ctx) };
        let frame = read_frame(esp0);

        assert_eq!(frame.cs, USER_CS_SEL as u32);
        // the two extra words sit just above the eflags slot
        let above = esp0 + core::mem::size_of::<SavedContext>();
        let (user_esp, ss) = unsafe { ((above as *const u32).read(), (above as *const u32).add(1).read()) };
        assert_eq!(user_esp, 0x0040_0000);
        assert_eq!(ss, USER_DS_SEL as u32);
    }

    #[test]
    fn flags_are_sanitized() {
        // trap, vm86 and nested-task must not leak into a fresh context
        let seed = (EFlags::TRAP | EFlags::VM86 | EFlags::NESTED_TASK | EFlags::CARRY).bits();
        let flags = initial_eflags(seed);
        assert_eq!(flags & EFlags::TRAP.bits(), 0);
        assert_eq!(flags & EFlags::VM86.bits(), 0);
        assert_eq!(flags & EFlags::NESTED_TASK.bits(), 0);
        assert_ne!(flags & EFlags::INTERRUPT.bits(), 0);
        assert_eq!(flags & EFlags::IOPL.bits(), EFlags::IOPL.bits());
        assert_ne!(flags & EFlags::CARRY.bits(), 0);
    }

    #[test]
    fn sanitizer_only_touches_its_own_bits() {
        // zero, sign, parity, adjust, overflow, direction
        const ARITHMETIC_BITS: u32 = 1 << 6 | 1 << 7 | 1 << 2 | 1 << 4 | 1 << 11 | 1 << 10;
        let flags = initial_eflags(ARITHMETIC_BITS);
        assert_eq!(flags & ARITHMETIC_BITS, ARITHMETIC_BITS);

        // and a seed of all ones loses exactly the three cleared bits
        let cleared = (EFlags::TRAP | EFlags::VM86 | EFlags::NESTED_TASK).bits();
        assert_eq!(initial_eflags(!0), !cleared);
    }

    #[test]
    fn register_block_round_trips_extreme_patterns() {
        let all_ones = PushedRegs {
            edi: !0,
            esi: !0,
            ebp: !0,
            esp: !0,
            ebx: !0,
            edx: !0,
            ecx: !0,
            eax: !0,
        };
        for regs in [PushedRegs::default(), all_ones] {
            let mut stack = [0u8; 64];
            let top = stack.as_mut_ptr() as usize + stack.len();
            let mut cursor = unsafe { Stacker::new(top) };
            unsafe { cursor.push_registers(&regs) };
            let read = unsafe { (cursor.esp() as *const PushedRegs).read() };
            assert_eq!(read, regs);
        }
    }

    #[test]
    fn misaligned_top_is_aligned_down() {
        let mut stack = [0u8; 64];
        let top = (stack.as_mut_ptr() as usize + stack.len()) & !0b11;
        let cursor = unsafe { Stacker::new(top + 3) };
        assert_eq!(cursor.esp(), top);
    }
}
