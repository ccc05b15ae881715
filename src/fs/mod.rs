//! Read-only table of programs baked into the kernel image.
//!
//! Just enough of a filesystem to find and load the first user program:
//! name lookup, index lookup, and positioned reads.

/// The first user program.
///
/// ```text
/// b8 01 00 00 00    mov eax, 1      ; halt
/// bb 05 00 00 00    mov ebx, 5      ; status
/// cd 80             int 0x80
/// eb fe             jmp $
/// ```
static INIT_IMAGE: &[u8] = &[
    0xb8, 0x01, 0x00, 0x00, 0x00, 0xbb, 0x05, 0x00, 0x00, 0x00, 0xcd, 0x80, 0xeb, 0xfe,
];

/// Parks the CPU in ring 3.
///
/// ```text
/// eb fe             jmp $
/// ```
static IDLE_IMAGE: &[u8] = &[0xeb, 0xfe];

#[derive(Clone, Copy)]
pub(crate) struct Dentry {
    pub name: &'static str,
    pub data: &'static [u8],
}

static BOOT_IMAGES: [Dentry; 2] = [
    Dentry {
        name: "init",
        data: INIT_IMAGE,
    },
    Dentry {
        name: "idle",
        data: IDLE_IMAGE,
    },
];

pub(crate) fn read_dentry_by_name(name: &str) -> Option<Dentry> {
    BOOT_IMAGES.iter().copied().find(|d| d.name == name)
}

pub(crate) fn read_dentry_by_index(index: usize) -> Option<Dentry> {
    BOOT_IMAGES.get(index).copied()
}

pub(crate) fn file_size(name: &str) -> Option<usize> {
    read_dentry_by_name(name).map(|d| d.data.len())
}

/// Copy up to `buf.len()` bytes starting at `offset`. Returns the number
/// copied; zero once the offset reaches the end, `None` past it.
pub(crate) fn read_data(dentry: &Dentry, offset: usize, buf: &mut [u8]) -> Option<usize> {
    if offset > dentry.data.len() {
        return None;
    }
    let src = &dentry.data[offset..];
    let n = src.len().min(buf.len());
    buf[..n].copy_from_slice(&src[..n]);
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index_agree() {
        let by_name = read_dentry_by_name("init").unwrap();
        let by_index = read_dentry_by_index(0).unwrap();
        assert_eq!(by_name.name, by_index.name);
        assert!(read_dentry_by_name("no-such-file").is_none());
        assert!(read_dentry_by_index(99).is_none());
    }

    #[test]
    fn init_image_ends_parked() {
        let init = read_dentry_by_name("init").unwrap();
        assert_eq!(file_size("init"), Some(init.data.len()));
        // jmp $
        assert_eq!(&init.data[init.data.len() - 2..], &[0xeb, 0xfe]);
    }

    #[test]
    fn positioned_reads() {
        let init = read_dentry_by_name("init").unwrap();
        let mut buf = [0u8; 4];

        assert_eq!(read_data(&init, 0, &mut buf), Some(4));
        assert_eq!(buf[0], 0xb8);

        // short read at the tail
        assert_eq!(read_data(&init, init.data.len() - 2, &mut buf), Some(2));
        assert_eq!(&buf[..2], &[0xeb, 0xfe]);

        // at the end: zero bytes; past it: error
        assert_eq!(read_data(&init, init.data.len(), &mut buf), Some(0));
        assert_eq!(read_data(&init, init.data.len() + 1, &mut buf), None);
    }
}
