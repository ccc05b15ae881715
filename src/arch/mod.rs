pub(crate) mod x86;

pub(crate) use x86::{disable_interrupts, enable_interrupts, is_int_enabled};
