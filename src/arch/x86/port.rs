use core::arch::asm;

// Width-polymorphic port access, one impl per transfer size.
pub(crate) trait InOut {
    unsafe fn port_in(port: u16) -> Self;
    unsafe fn port_out(port: u16, data: Self);
}

impl InOut for u8 {
    unsafe fn port_in(port: u16) -> Self {
        let data: u8;
        asm!("in al, dx", in("dx") port, out("al") data, options(readonly, nostack));
        data
    }
    unsafe fn port_out(port: u16, data: Self) {
        asm!("out dx, al", in("dx") port, in("al") data);
    }
}

impl InOut for u16 {
    unsafe fn port_in(port: u16) -> Self {
        let data: u16;
        asm!("in ax, dx", in("dx") port, out("ax") data, options(readonly, nostack));
        data
    }
    unsafe fn port_out(port: u16, data: Self) {
        asm!("out dx, ax", in("dx") port, in("ax") data);
    }
}

impl InOut for u32 {
    unsafe fn port_in(port: u16) -> Self {
        let data: u32;
        asm!("in eax, dx", in("dx") port, out("eax") data, options(readonly, nostack));
        data
    }
    unsafe fn port_out(port: u16, data: Self) {
        asm!("out dx, eax", in("dx") port, in("eax") data);
    }
}

pub(crate) struct Port(u16);

impl Port {
    pub(crate) fn new(port: u16) -> Self {
        Self(port)
    }

    pub(crate) unsafe fn read<T: InOut>(&mut self) -> T {
        T::port_in(self.0)
    }

    pub(crate) unsafe fn write<T: InOut>(&mut self, data: T) {
        T::port_out(self.0, data)
    }
}

// a small delay, needed between PIC initialisation words on old hardware
pub(crate) unsafe fn io_wait() {
    u8::port_out(0x80, 0);
}
