//! The canonical saved-context frame and the two-phase interrupt protocol.
//!
//! Phase one ("normalize entry") is the naked stubs at the bottom: whatever
//! the vector, they push the incoming accumulator and then the full PUSHAD
//! block, so every kernel stack with a suspended thread carries the exact
//! same layout under the hardware iret frame:
//!
//! ```text
//! esp0 -> edi esi ebp esp ebx edx ecx eax   (PUSHAD block)
//!         ret_eax                           (syscall return slot)
//!         eip cs eflags                     (hardware frame)
//!         [user esp, user ss]               (only on privilege change)
//! ```
//!
//! Phase two ("decide and restore") is ordinary Rust: dispatch, write the
//! result into the return slot, record where the frame sits into the
//! interrupted thread's `esp0`, ask the scheduler for a switch target. The
//! stubs then substitute ESP if asked and run the one restore sequence
//! (`popad; pop eax; iretd`) that both entry paths agree on.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::arch::x86::process;
use crate::arch::x86::syscall;

/// PUSHAD block in memory order (EDI at the lowest address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct PushedRegs {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

/// The canonical saved-context frame, as the restore path consumes it.
/// `regs.esp` is what PUSHAD happened to save; POPAD ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SavedContext {
    pub regs: PushedRegs,
    pub ret_eax: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

// Current interrupt nesting. The scheduler may only switch from the
// outermost interrupt (depth 1); a nested frame substituted for an outer one
// would unwind into the wrong context.
static INTERRUPT_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Dispatch a syscall frame and store the result in the return slot. The
/// resumed register set carries it whether or not a switch intervenes.
pub(crate) fn handle_syscall_frame(frame: &mut SavedContext) {
    let result = syscall::dispatch(
        frame.regs.eax,
        frame.regs.ebx,
        frame.regs.ecx,
        frame.regs.edx,
    );
    frame.ret_eax = result as u32;
}

/// Phase two for the syscall vector. Returns the target `esp0` for the stub
/// to load, or 0 to resume the interrupted thread in place.
pub(crate) extern "C" fn syscall_entry_inner(frame: *mut SavedContext) -> usize {
    let depth = INTERRUPT_DEPTH.fetch_add(1, Ordering::Relaxed) + 1;

    // SAFETY: the stub passes the address of the frame it just pushed
    let frame = unsafe { &mut *frame };
    // return value must land in the frame before any switch decision
    handle_syscall_frame(frame);

    let target = process::record_and_decide(frame as *mut _ as usize, depth);
    INTERRUPT_DEPTH.fetch_sub(1, Ordering::Relaxed);
    target
}

/// Phase two for the timer vector: identical contract, no dispatch. The
/// scheduler is deliberately agnostic to which of the two called it.
pub(crate) extern "C" fn timer_entry_inner(frame: *mut SavedContext) -> usize {
    let depth = INTERRUPT_DEPTH.fetch_add(1, Ordering::Relaxed) + 1;

    #[cfg(target_arch = "x86")]
    unsafe {
        crate::arch::x86::pic::send_eoi(0);
    }

    let target = process::record_and_decide(frame as usize, depth);
    INTERRUPT_DEPTH.fetch_sub(1, Ordering::Relaxed);
    target
}

#[cfg(target_arch = "x86")]
mod stubs {
    use super::*;

    // Phase one plus restore. `push esp` hands phase two the frame base,
    // which doubles as the esp0 to resume with. After `add esp, 4` the stack
    // pointer sits exactly at the frame again, switched or not.
    macro_rules! entry_stub {
        ($stub:ident, $inner:ident) => {
            #[unsafe(naked)]
            pub(in super::super) extern "C" fn $stub() {
                core::arch::naked_asm!(
                    "push eax",
                    "pushad",
                    "push esp",
                    "call {inner}",
                    "add esp, 4",
                    "test eax, eax",
                    "jz 2f",
                    "mov esp, eax",
                    "2:",
                    "popad",
                    "pop eax",
                    "iretd",
                    inner = sym $inner,
                )
            }
        };
    }

    entry_stub!(syscall_entry, syscall_entry_inner);
    entry_stub!(timer_entry, timer_entry_inner);
}

#[cfg(target_arch = "x86")]
pub(super) use stubs::{syscall_entry, timer_entry};
