use super::pid::{Pid, PidPool, MAX_PROCESSES};
use super::stacker::{build_initial_context, InitialContext};

pub(crate) const THREAD_KSTACK_SIZE: usize = 8192;

/// Per-thread kernel stack. The alignment keeps frame construction off odd
/// addresses regardless of where the table lands.
#[repr(C, align(16))]
pub(crate) struct KernelStack {
    bytes: [u8; THREAD_KSTACK_SIZE],
}

impl KernelStack {
    const fn new() -> Self {
        Self {
            bytes: [0; THREAD_KSTACK_SIZE],
        }
    }
}

/// The execution state of a process's main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThreadInfo {
    /// Where the thread's canonical frame sits when it is suspended.
    /// Meaningless while the thread runs.
    pub esp0: usize,
    /// One past the end of the thread's kernel stack; loaded into the TSS
    /// when the thread is switched to.
    pub kstack_top: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProcessDesc {
    pub pid: Pid,
    pub parent: Option<Pid>,
    /// False until the scheduler builds the launch frame. A paused process
    /// owns a descriptor and a stack but no context yet.
    pub started: bool,
    pub sched_next: Option<Pid>,
    pub sched_prev: Option<Pid>,
    pub entry_point: usize,
    pub code_selector: u16,
    pub user_stack: Option<(u16, u32)>,
    pub main_thread: ThreadInfo,
}

/// All process state, kernel stacks included. Guarded by one lock; every
/// path that reads or writes it runs with interrupts off.
pub(crate) struct ProcessTable {
    pids: PidPool,
    slots: [Option<ProcessDesc>; MAX_PROCESSES],
    kstacks: [KernelStack; MAX_PROCESSES],
    pub current: Option<Pid>,
}

impl ProcessTable {
    pub(crate) const fn new() -> Self {
        const EMPTY: Option<ProcessDesc> = None;
        const STACK: KernelStack = KernelStack::new();
        Self {
            pids: PidPool::new(),
            slots: [EMPTY; MAX_PROCESSES],
            kstacks: [STACK; MAX_PROCESSES],
            current: None,
        }
    }

    /// Create a process that exists but has never run: pid and kernel stack
    /// allocated, no context built, not on the run queue. Launch details are
    /// filled in afterwards. `None` when the table is full.
    pub(crate) fn create_paused(&mut self, parent: Option<Pid>) -> Option<Pid> {
        let pid = self.pids.alloc()?;
        let kstack_top = self.kstack_top(pid);
        self.slots[pid.index()] = Some(ProcessDesc {
            pid,
            parent,
            started: false,
            sched_next: None,
            sched_prev: None,
            entry_point: 0,
            code_selector: 0,
            user_stack: None,
            main_thread: ThreadInfo {
                esp0: kstack_top,
                kstack_top,
            },
        });
        Some(pid)
    }

    pub(crate) fn get(&self, pid: Pid) -> Option<&ProcessDesc> {
        self.slots.get(pid.index())?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessDesc> {
        self.slots.get_mut(pid.index())?.as_mut()
    }

    pub(crate) fn kstack_top(&self, pid: Pid) -> usize {
        let stack = &self.kstacks[pid.index()];
        stack.bytes.as_ptr() as usize + THREAD_KSTACK_SIZE
    }

    /// The suspended thread of whichever process is current.
    pub(crate) fn current_thread_mut(&mut self) -> Option<&mut ThreadInfo> {
        let pid = self.current?;
        Some(&mut self.get_mut(pid)?.main_thread)
    }

    /// Insert `pid` into the circular run queue, behind the current
    /// process. A lone runnable process links to itself.
    pub(crate) fn make_runnable(&mut self, pid: Pid) {
        debug_assert!(self.pids.is_live(pid));
        let anchor = match self.current.or_else(|| self.any_runnable()) {
            None => {
                let desc = self.get_mut(pid).unwrap();
                desc.sched_next = Some(pid);
                desc.sched_prev = Some(pid);
                return;
            }
            Some(anchor) => anchor,
        };
        let prev = self.get(anchor).and_then(|d| d.sched_prev).unwrap_or(anchor);
        {
            let desc = self.get_mut(pid).unwrap();
            desc.sched_next = Some(anchor);
            desc.sched_prev = Some(prev);
        }
        self.get_mut(prev).unwrap().sched_next = Some(pid);
        self.get_mut(anchor).unwrap().sched_prev = Some(pid);
    }

    fn any_runnable(&self) -> Option<Pid> {
        self.slots
            .iter()
            .flatten()
            .find(|d| d.sched_next.is_some())
            .map(|d| d.pid)
    }

    /// Build the launch frame for a process that has never run and record
    /// where it sits. Idempotent per process: a second call is a no-op.
    pub(crate) fn start(&mut self, pid: Pid) {
        let kstack_top = self.kstack_top(pid);
        let desc = match self.get_mut(pid) {
            Some(desc) if !desc.started => desc,
            _ => return,
        };
        let ctx = InitialContext {
            entry: desc.entry_point,
            code_selector: desc.code_selector,
            eflags_seed: 0,
            user_stack: desc.user_stack,
        };
        // SAFETY: the table owns the stack and the process is not running
        desc.main_thread.esp0 = unsafe { build_initial_context(kstack_top, &ctx) };
        desc.started = true;
    }
}
