use super::entry::{syscall_entry, timer_entry};
use super::idt::{HandlerFn, InterruptDescriptorTable, Options};
use crate::arch::x86::halt_loop;
use crate::println;
use lazy_static::lazy_static;
use paste::paste;

pub(super) const TIMER_VECTOR: usize = 0x20;
pub(super) const SYSCALL_VECTOR: usize = 0x80;

/// Hardware iret frame as an exception handler sees it.
#[repr(C)]
struct InterruptStackFrame {
    eip: u32,
    cs: u32,
    eflags: u32,
}

// Exception stubs produce the same canonical frame as the syscall and timer
// paths (accumulator slot included) so a handler that returns resumes
// through the identical popad/pop/iretd sequence.
macro_rules! handler {
    ($int: ident) => {{
        paste! {
            #[unsafe(naked)]
            extern "C" fn [<stub_$int>]() {
                core::arch::naked_asm!(
                    "push eax",
                    "pushad",
                    "lea eax, [esp + 36]",
                    "push eax",
                    "call {}",
                    "add esp, 4",
                    "popad",
                    "pop eax",
                    "iretd",
                    sym $int,
                )
            }
            [<stub_$int>] as HandlerFn
        }
    }};
}

// Same, for vectors where the hardware pushes an error code. The xchg folds
// the error-code slot into the frame's accumulator slot while moving the
// code into a register, keeping the stack layout canonical.
macro_rules! handler_with_error_code {
    ($int: ident) => {{
        paste! {
            #[unsafe(naked)]
            extern "C" fn [<stub_$int>]() {
                core::arch::naked_asm!(
                    "xchg eax, [esp]",
                    "pushad",
                    "push eax",
                    "lea eax, [esp + 40]",
                    "push eax",
                    "call {}",
                    "add esp, 8",
                    "popad",
                    "pop eax",
                    "iretd",
                    sym $int,
                )
            }
            [<stub_$int>] as HandlerFn
        }
    }};
}

extern "C" fn divide_error(isf: &InterruptStackFrame) {
    println!("EXCEPTION: DIVIDE ERROR @ {:#x}", isf.eip);
    halt_loop();
}

extern "C" fn breakpoint(isf: &InterruptStackFrame) {
    println!("EXCEPTION: BREAKPOINT @ {:#x}", isf.eip);
}

extern "C" fn invalid_opcode(isf: &InterruptStackFrame) {
    println!("EXCEPTION: INVALID OPCODE @ {:#x}", isf.eip);
    halt_loop();
}

extern "C" fn general_protection(isf: &InterruptStackFrame, error_code: u32) {
    println!(
        "EXCEPTION: GENERAL PROTECTION ({:#x}) @ {:#x}",
        error_code, isf.eip
    );
    halt_loop();
}

extern "C" fn page_fault(isf: &InterruptStackFrame, error_code: u32) {
    println!(
        "EXCEPTION: PAGE FAULT accessing {:#x} ({:#b}) @ {:#x}",
        get_faulty_address(),
        error_code,
        isf.eip
    );
    halt_loop();
}

// faulting address lives in CR2
fn get_faulty_address() -> u32 {
    let addr;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) addr, options(nostack));
    }
    addr
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.add_handler(0x0, handler!(divide_error));
        idt.add_handler(0x3, handler!(breakpoint));
        idt.add_handler(0x6, handler!(invalid_opcode));
        idt.add_handler(0xd, handler_with_error_code!(general_protection));
        idt.add_handler(0xe, handler_with_error_code!(page_fault));

        idt.add_handler(TIMER_VECTOR, timer_entry);
        idt.add_handler_with(SYSCALL_VECTOR, syscall_entry, Options::user_interrupt());
        idt
    };
}

pub(super) fn init() {
    IDT.load();
}
