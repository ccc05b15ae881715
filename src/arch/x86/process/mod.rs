pub(crate) mod pid;
pub(crate) mod process;
pub(crate) mod scheduler;
pub(crate) mod stacker;

use crate::arch::x86::gdt;
use crate::locks::SpinLockIrq;
use process::ProcessTable;
use scheduler::NO_SWITCH;

pub(crate) static PROCESS_TABLE: SpinLockIrq<ProcessTable> =
    SpinLockIrq::new(ProcessTable::new());

/// Phase two of every interrupt: pin the interrupted thread's frame address
/// into its descriptor, then ask the scheduler where to resume. Returns the
/// target `esp0`, or `NO_SWITCH` to resume in place.
pub(crate) fn record_and_decide(frame_esp0: usize, depth: usize) -> usize {
    let mut table = PROCESS_TABLE.lock();

    // before the first thread launches there is nothing to record or switch
    let thread = match table.current_thread_mut() {
        Some(thread) => thread,
        None => return NO_SWITCH,
    };
    thread.esp0 = frame_esp0;

    let mut tss = gdt::TSS.lock();
    scheduler::dispatch_decision(&mut table, &mut tss, depth).unwrap_or(NO_SWITCH)
}
