//! Round-robin switch decisions over the run queue.
//!
//! The scheduler never moves a stack itself. It answers one question, asked
//! from the outermost interrupt only: which saved frame should the restore
//! sequence unwind into. The entry stub does the actual ESP substitution.

use super::process::ProcessTable;
use crate::arch::x86::gdt::TaskStateSegment;

/// Sentinel the entry stubs understand as "keep the current stack".
pub(crate) const NO_SWITCH: usize = 0;

/// Pick the next process, or `None` to resume the interrupted one in place.
///
/// Only the outermost interrupt (depth 1) may switch: a nested frame sits
/// on top of an outer one on the same stack, and substituting it would
/// unwind the wrong context. On a switch the target's launch frame is built
/// if it never ran, and the TSS is repointed at its kernel stack so the next
/// privilege-raising interrupt lands there.
pub(crate) fn dispatch_decision(
    table: &mut ProcessTable,
    tss: &mut TaskStateSegment,
    depth: usize,
) -> Option<usize> {
    if depth != 1 {
        return None;
    }
    let cur = table.current?;
    let next = table.get(cur)?.sched_next?;
    if next == cur {
        return None;
    }

    table.start(next);
    table.current = Some(next);
    tss.esp0 = table.kstack_top(next) as u32;

    log::trace!("switch {:?} -> {:?}", cur, next);
    Some(table.get(next)?.main_thread.esp0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::x86::gdt::USER_CS_SEL;
    use crate::arch::x86::interrupts::entry::SavedContext;
    use crate::arch::x86::process::pid::Pid;

    fn two_runnable() -> (Box<ProcessTable>, Pid, Pid) {
        let mut t = Box::new(ProcessTable::new());
        let a = t.create_paused(None).unwrap();
        let b = t.create_paused(Some(a)).unwrap();
        for pid in [a, b] {
            let desc = t.get_mut(pid).unwrap();
            desc.entry_point = 0x0030_0000;
            desc.code_selector = USER_CS_SEL;
        }
        t.make_runnable(a);
        t.current = Some(a);
        t.start(a);
        t.make_runnable(b);
        (t, a, b)
    }

    #[test]
    fn nested_interrupts_never_switch() {
        let (mut t, a, b) = two_runnable();
        let mut tss = TaskStateSegment::new();
        let before = (*t.get(a).unwrap(), *t.get(b).unwrap(), t.current);
        let esp0_before = tss.esp0;

        // repeated non-outermost queries: null answer, nothing mutated
        for depth in [2, 3, 2] {
            assert_eq!(dispatch_decision(&mut t, &mut tss, depth), None);
            assert_eq!(*t.get(a).unwrap(), before.0);
            assert_eq!(*t.get(b).unwrap(), before.1);
            assert_eq!(t.current, before.2);
            let esp0 = tss.esp0;
            assert_eq!(esp0, esp0_before);
        }
    }

    #[test]
    fn lone_process_resumes_in_place() {
        let mut t = Box::new(ProcessTable::new());
        let pid = t.create_paused(None).unwrap();
        t.make_runnable(pid);
        t.current = Some(pid);
        let mut tss = TaskStateSegment::new();
        assert_eq!(dispatch_decision(&mut t, &mut tss, 1), None);
    }

    #[test]
    fn switch_targets_the_next_frame_and_repoints_the_tss() {
        let (mut t, a, b) = two_runnable();
        let mut tss = TaskStateSegment::new();

        let target = dispatch_decision(&mut t, &mut tss, 1).unwrap();
        assert_eq!(t.current, Some(b));
        assert_eq!(target, t.get(b).unwrap().main_thread.esp0);
        let esp0 = tss.esp0;
        assert_eq!(esp0, t.kstack_top(b) as u32);

        // first switch to b built its launch frame lazily
        assert!(t.get(b).unwrap().started);
        let frame = unsafe { (target as *const SavedContext).read() };
        assert_eq!(frame.eip, 0x0030_0000);

        // and round-robin brings a back
        let target = dispatch_decision(&mut t, &mut tss, 1).unwrap();
        assert_eq!(t.current, Some(a));
        assert_eq!(target, t.get(a).unwrap().main_thread.esp0);
    }

    #[test]
    fn no_current_process_means_no_decision() {
        let mut t = Box::new(ProcessTable::new());
        let mut tss = TaskStateSegment::new();
        assert_eq!(dispatch_decision(&mut t, &mut tss, 1), None);
    }
}
