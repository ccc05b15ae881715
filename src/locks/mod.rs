mod spinlock_irq;

pub use spinlock_irq::{GuardIrq, SpinLockIrq};
