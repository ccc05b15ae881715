/// Fixed ceiling on live processes; pids are recycled within it.
pub(crate) const MAX_PROCESSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pid(pub u32);

impl Pid {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pid allocator over a bitmask, one bit per slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PidPool {
    used: u32,
}

impl PidPool {
    pub(crate) const fn new() -> Self {
        Self { used: 0 }
    }

    /// Lowest free pid, or `None` when all slots are live.
    pub(crate) fn alloc(&mut self) -> Option<Pid> {
        let free = (!self.used).trailing_zeros();
        if free as usize >= MAX_PROCESSES {
            return None;
        }
        self.used |= 1 << free;
        Some(Pid(free))
    }

    pub(crate) fn release(&mut self, pid: Pid) {
        self.used &= !(1 << pid.0);
    }

    pub(crate) fn is_live(&self, pid: Pid) -> bool {
        pid.index() < MAX_PROCESSES && self.used & (1 << pid.0) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_lowest_free_first() {
        let mut pool = PidPool::new();
        assert_eq!(pool.alloc(), Some(Pid(0)));
        assert_eq!(pool.alloc(), Some(Pid(1)));
        pool.release(Pid(0));
        assert_eq!(pool.alloc(), Some(Pid(0)));
        assert_eq!(pool.alloc(), Some(Pid(2)));
    }

    #[test]
    fn exhaustion_then_recycle() {
        let mut pool = PidPool::new();
        for i in 0..MAX_PROCESSES {
            assert_eq!(pool.alloc(), Some(Pid(i as u32)));
        }
        assert_eq!(pool.alloc(), None);
        pool.release(Pid(3));
        assert_eq!(pool.alloc(), Some(Pid(3)));
        assert_eq!(pool.alloc(), None);
    }

    #[test]
    fn liveness_tracks_alloc_and_release() {
        let mut pool = PidPool::new();
        let pid = pool.alloc().unwrap();
        assert!(pool.is_live(pid));
        pool.release(pid);
        assert!(!pool.is_live(pid));
        assert!(!pool.is_live(Pid(99)));
    }
}
