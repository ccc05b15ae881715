//! Syscall numbering, argument marshalling and the dispatch table.
//!
//! Numbers arrive in EAX, arguments in EBX/ECX/EDX, results go back through
//! the saved frame's return slot as a signed word. Every failure is -1; the
//! caller gets no finer-grained errno.

mod user;

use user::UserSlice;

pub const SYS_HALT: u32 = 1;
pub const SYS_EXECUTE: u32 = 2;
pub const SYS_READ: u32 = 3;
pub const SYS_WRITE: u32 = 4;
pub const SYS_OPEN: u32 = 5;
pub const SYS_CLOSE: u32 = 6;
pub const SYS_GETARGS: u32 = 7;
pub const SYS_VIDMAP: u32 = 8;
pub const SYS_SET_HANDLER: u32 = 9;
pub const SYS_SIGRETURN: u32 = 10;

const MAX_SYSCALL: u32 = SYS_SIGRETURN;

/// A handler's arity. Dispatch passes exactly the registers the handler
/// declares; the rest are dropped before the call.
#[derive(Clone, Copy)]
enum Handler {
    Arg1(fn(u32) -> i32),
    Arg2(fn(u32, u32) -> i32),
    Arg3(fn(u32, u32, u32) -> i32),
}

impl Handler {
    fn invoke(self, ebx: u32, ecx: u32, edx: u32) -> i32 {
        match self {
            Self::Arg1(f) => f(ebx),
            Self::Arg2(f) => f(ebx, ecx),
            Self::Arg3(f) => f(ebx, ecx, edx),
        }
    }
}

struct SyscallEntry {
    name: &'static str,
    handler: Handler,
}

// index 0 is never a syscall
static SYSCALL_TABLE: [Option<SyscallEntry>; MAX_SYSCALL as usize + 1] = [
    None,
    Some(SyscallEntry { name: "halt", handler: Handler::Arg1(halt) }),
    Some(SyscallEntry { name: "execute", handler: Handler::Arg1(execute) }),
    Some(SyscallEntry { name: "read", handler: Handler::Arg3(read) }),
    Some(SyscallEntry { name: "write", handler: Handler::Arg3(write) }),
    Some(SyscallEntry { name: "open", handler: Handler::Arg1(open) }),
    Some(SyscallEntry { name: "close", handler: Handler::Arg1(close) }),
    Some(SyscallEntry { name: "getargs", handler: Handler::Arg2(getargs) }),
    Some(SyscallEntry { name: "vidmap", handler: Handler::Arg1(vidmap) }),
    Some(SyscallEntry { name: "set_handler", handler: Handler::Arg2(set_handler) }),
    Some(SyscallEntry { name: "sigreturn", handler: Handler::Arg1(sigreturn) }),
];

/// Route a syscall frame to its handler. Out-of-table numbers fail with -1
/// instead of faulting, so a misbehaving program costs itself nothing but
/// its own return value.
pub(crate) fn dispatch(eax: u32, ebx: u32, ecx: u32, edx: u32) -> i32 {
    let entry = match SYSCALL_TABLE.get(eax as usize).and_then(Option::as_ref) {
        Some(entry) => entry,
        None => {
            log::warn!("unknown syscall {}", eax);
            return -1;
        }
    };
    log::trace!("syscall {} ({})", entry.name, eax);
    entry.handler.invoke(ebx, ecx, edx)
}

fn halt(status: u32) -> i32 {
    // only the low byte of the status survives, like an exit code
    log::info!("halt({})", status as u8);
    0
}

fn execute(command: u32) -> i32 {
    match UserSlice::from_c_str(command as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn read(fd: u32, buf: u32, nbytes: u32) -> i32 {
    let _ = fd;
    match UserSlice::from_words(buf as usize, nbytes as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn write(fd: u32, buf: u32, nbytes: u32) -> i32 {
    let _ = fd;
    match UserSlice::from_words(buf as usize, nbytes as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn open(filename: u32) -> i32 {
    match UserSlice::from_c_str(filename as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn close(fd: u32) -> i32 {
    let _ = fd;
    0
}

fn getargs(buf: u32, nbytes: u32) -> i32 {
    match UserSlice::from_words(buf as usize, nbytes as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn vidmap(screen_start: u32) -> i32 {
    // the argument is a user pointer to where the mapping should be written
    match user::user_word_ptr(screen_start as usize) {
        Some(_) => 0,
        None => -1,
    }
}

fn set_handler(signum: u32, handler_address: u32) -> i32 {
    let _ = (signum, handler_address);
    -1
}

fn sigreturn(_unused: u32) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_numbers_fail() {
        assert_eq!(dispatch(0, 0, 0, 0), -1);
        assert_eq!(dispatch(MAX_SYSCALL + 1, 0, 0, 0), -1);
        assert_eq!(dispatch(0xdead_beef, 0, 0, 0), -1);
    }

    #[test]
    fn halt_accepts_any_status() {
        assert_eq!(dispatch(SYS_HALT, 0, 0, 0), 0);
        assert_eq!(dispatch(SYS_HALT, 257, 0, 0), 0);
    }

    #[test]
    fn write_rejects_kernel_buffers() {
        // null page
        assert_eq!(dispatch(SYS_WRITE, 1, 0x0, 16), -1);
        // above the user ceiling
        assert_eq!(dispatch(SYS_WRITE, 1, 0x0040_0000, 16), -1);
        // straddles the ceiling
        assert_eq!(dispatch(SYS_WRITE, 1, 0x003f_fff0, 64), -1);
    }

    #[test]
    fn write_accepts_user_buffers() {
        assert_eq!(dispatch(SYS_WRITE, 1, 0x0030_0000, 128), 0);
    }

    #[test]
    fn pointer_taking_calls_validate_their_arguments() {
        assert_eq!(dispatch(SYS_EXECUTE, 0x0030_0000, 0, 0), 0);
        assert_eq!(dispatch(SYS_EXECUTE, 0x0, 0, 0), -1);

        assert_eq!(dispatch(SYS_READ, 0, 0x0030_0000, 64), 0);
        assert_eq!(dispatch(SYS_READ, 0, 0x0, 64), -1);

        assert_eq!(dispatch(SYS_OPEN, 0x0030_0000, 0, 0), 0);
        assert_eq!(dispatch(SYS_OPEN, 0xfff0_0000, 0, 0), -1);

        assert_eq!(dispatch(SYS_CLOSE, 3, 0, 0), 0);

        assert_eq!(dispatch(SYS_GETARGS, 0x0030_0000, 32, 0), 0);
        assert_eq!(dispatch(SYS_GETARGS, 0x0, 32, 0), -1);

        assert_eq!(dispatch(SYS_VIDMAP, 0x0030_0004, 0, 0), 0);
        // misaligned mapping target
        assert_eq!(dispatch(SYS_VIDMAP, 0x0030_0002, 0, 0), -1);
    }

    #[test]
    fn unimplemented_signal_calls_fail() {
        assert_eq!(dispatch(SYS_SET_HANDLER, 2, 0x0030_0000, 0), -1);
        assert_eq!(dispatch(SYS_SIGRETURN, 0, 0, 0), -1);
    }

    #[test]
    fn extra_registers_are_dropped_by_arity() {
        // halt takes one argument; junk in ecx/edx must not change anything
        assert_eq!(dispatch(SYS_HALT, 0, 0xffff_ffff, 0xffff_ffff), 0);
    }
}
