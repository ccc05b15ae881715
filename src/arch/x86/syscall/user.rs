//! Validation of pointers handed in from ring 3.
//!
//! User programs live in one window of the address space; anything outside
//! it, including the null page and all of kernel memory, is rejected before
//! a handler ever touches the pointer.

/// First address a user pointer may reference. Keeps the null page and the
/// real-mode area off limits.
pub(crate) const MIN_USER_ADDR: usize = 0x1000;

/// One past the last valid user address; the kernel's 4MB page starts here.
pub(crate) const USER_ADDR_LIMIT: usize = 0x0040_0000;

/// A byte range proven to lie inside the user window. Holding one is the
/// capability to copy to or from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UserSlice {
    addr: usize,
    len: usize,
}

impl UserSlice {
    /// Validate `len` bytes at `addr`. Fails on wraparound as well as on a
    /// range touching anything outside the window.
    pub(crate) fn from_words(addr: usize, len: usize) -> Option<Self> {
        let end = addr.checked_add(len)?;
        if addr < MIN_USER_ADDR || end > USER_ADDR_LIMIT {
            return None;
        }
        Some(Self { addr, len })
    }

    /// Validate the start of a NUL-terminated string. The slice covers the
    /// rest of the window; the consumer scans for the terminator and fails
    /// if it never appears.
    pub(crate) fn from_c_str(addr: usize) -> Option<Self> {
        if addr >= USER_ADDR_LIMIT {
            return None;
        }
        Self::from_words(addr, USER_ADDR_LIMIT - addr)
    }

    pub(crate) fn addr(&self) -> usize {
        self.addr
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

/// Validate a user pointer to a single aligned word.
pub(crate) fn user_word_ptr(addr: usize) -> Option<*mut u32> {
    if addr & 0b11 != 0 {
        return None;
    }
    UserSlice::from_words(addr, core::mem::size_of::<u32>()).map(|s| s.addr() as *mut u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_edges() {
        assert!(UserSlice::from_words(MIN_USER_ADDR, 1).is_some());
        assert!(UserSlice::from_words(MIN_USER_ADDR - 1, 1).is_none());
        assert!(UserSlice::from_words(USER_ADDR_LIMIT - 1, 1).is_some());
        assert!(UserSlice::from_words(USER_ADDR_LIMIT - 1, 2).is_none());
    }

    #[test]
    fn length_overflow_is_rejected() {
        assert!(UserSlice::from_words(0x0030_0000, usize::MAX).is_none());
    }

    #[test]
    fn c_str_slice_runs_to_the_window_end() {
        let s = UserSlice::from_c_str(0x0030_0000).unwrap();
        assert_eq!(s.addr() + s.len(), USER_ADDR_LIMIT);
        assert!(UserSlice::from_c_str(0x0).is_none());
        assert!(UserSlice::from_c_str(USER_ADDR_LIMIT).is_none());
    }

    #[test]
    fn word_pointer_must_be_aligned() {
        assert!(user_word_ptr(0x0030_0002).is_none());
        assert!(user_word_ptr(0x0030_0004).is_some());
        assert!(user_word_ptr(USER_ADDR_LIMIT - 4).is_some());
        assert!(user_word_ptr(USER_ADDR_LIMIT).is_none());
    }
}
