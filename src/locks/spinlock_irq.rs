use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch::{disable_interrupts, enable_interrupts, is_int_enabled};

// Interrupt-safe spinlock.
// Protects data that is also touched from interrupt handlers (paging tables,
// the process table, the TSS): taking the lock saves and clears the interrupt
// flag, dropping the guard restores it. On a single CPU this is what makes
// the critical section atomic with respect to the timer interrupt.
pub struct SpinLockIrq<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

impl<T> SpinLockIrq<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> GuardIrq<T> {
        // Disable interrupts before spinning. If we end up waiting, the holder
        // is another context on this CPU that already disabled them, so the
        // flag we saved is still the one to restore.
        let were_enabled = is_int_enabled();
        if were_enabled {
            disable_interrupts();
        }

        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }

        GuardIrq {
            lock: self,
            reenable: were_enabled,
        }
    }

    // Raw pointer to the protected value, without taking the lock.
    // Only used to compute the base address of hardware structures: the TSS
    // descriptor needs the address, not the contents.
    pub fn data_ptr(&self) -> *mut T {
        self.value.get()
    }
}

unsafe impl<T> Sync for SpinLockIrq<T> where T: Send {}

pub struct GuardIrq<'a, T> {
    lock: &'a SpinLockIrq<T>,
    // interrupt flag state to restore on drop
    reenable: bool,
}

impl<T> Deref for GuardIrq<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for GuardIrq<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for GuardIrq<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
        if self.reenable {
            enable_interrupts();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SpinLockIrq;

    #[test]
    fn lock_gives_exclusive_mutable_access() {
        let lock = SpinLockIrq::new(0u32);
        {
            let mut guard = lock.lock();
            *guard += 41;
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 42);
    }

    #[test]
    fn lock_again_after_drop() {
        let lock = SpinLockIrq::new(());
        drop(lock.lock());
        drop(lock.lock());
    }
}
