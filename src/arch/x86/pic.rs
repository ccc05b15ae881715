use super::port::{io_wait, Port};
use bitflags::bitflags;
use lazy_static::lazy_static;
use spin::Mutex;

const MASTER_CMD_PORT: u16 = 0x0020;
const MASTER_DATA_PORT: u16 = 0x0021;
const SLAVE_CMD_PORT: u16 = 0x00a0;
const SLAVE_DATA_PORT: u16 = 0x00a1;

// Exception vectors end at 0x1f, hardware IRQs start right after.
pub(crate) const MASTER_VECTOR_OFFSET: u8 = 0x20;
pub(crate) const SLAVE_VECTOR_OFFSET: u8 = 0x28;

bitflags! {
    struct Icw1: u8 {
        const ICW4      = 0x01; // ICW4 (not) needed
        const SINGLE    = 0x02; // single (cascade) mode
        const INTERVAL4 = 0x04; // call address interval 4 (8)
        const LEVEL     = 0x08; // level triggered (edge) mode
        const INIT      = 0x10; // initialisation - required!
    }

    struct Icw4: u8 {
        const IS_8086    = 0x01; // 8086/88 (MCS-80/85) mode
        const AUTO       = 0x02; // auto (normal) EOI
        const BUF_SLAVE  = 0x08; // buffered mode/slave
        const BUF_MASTER = 0x0c; // buffered mode/master
        const SFNM       = 0x10; // special fully nested (not)
    }
}

struct Pic {
    cmd: Port,
    data: Port,
    offset: u8,
}

impl Pic {
    fn new(cmd_port: u16, data_port: u16, offset: u8) -> Self {
        Self {
            cmd: Port::new(cmd_port),
            data: Port::new(data_port),
            offset,
        }
    }

    unsafe fn remap(&mut self, other: u8) {
        // save mask
        let mask: u8 = self.data.read::<u8>();
        // ICW1 start initialisation sequence
        self.cmd.write((Icw1::INIT | Icw1::ICW4).bits());
        io_wait();
        // ICW2 set vector offset
        self.data.write(self.offset & !0x7);
        io_wait();
        // ICW3 set address of the other PIC
        self.data.write(other);
        io_wait();
        // ICW4
        self.data.write(Icw4::IS_8086.bits());
        io_wait();
        // restore mask
        self.data.write(mask);
    }

    unsafe fn send_eoi(&mut self) {
        self.cmd.write::<u8>(0x20);
    }

    unsafe fn set_mask(&mut self, irq: u8) {
        assert!(irq < 8);
        let mask: u8 = self.data.read();
        self.data.write(mask | (1 << irq));
    }

    unsafe fn clear_mask(&mut self, irq: u8) {
        assert!(irq < 8);
        let mask: u8 = self.data.read();
        self.data.write(mask & !(1 << irq));
    }
}

lazy_static! {
    static ref MASTER_PIC: Mutex<Pic> =
        Mutex::new(Pic::new(MASTER_CMD_PORT, MASTER_DATA_PORT, MASTER_VECTOR_OFFSET));
    static ref SLAVE_PIC: Mutex<Pic> =
        Mutex::new(Pic::new(SLAVE_CMD_PORT, SLAVE_DATA_PORT, SLAVE_VECTOR_OFFSET));
}

pub(crate) unsafe fn remap() {
    MASTER_PIC.lock().remap(4);
    SLAVE_PIC.lock().remap(2);
}

pub(crate) unsafe fn send_eoi(irq: u8) {
    assert!(irq < 16);
    if irq >= 8 {
        SLAVE_PIC.lock().send_eoi();
    }
    MASTER_PIC.lock().send_eoi();
}

pub(crate) unsafe fn set_mask(irq: u8) {
    assert!(irq < 16);
    if irq < 8 {
        MASTER_PIC.lock().set_mask(irq);
    } else {
        SLAVE_PIC.lock().set_mask(irq - 8);
    }
}

pub(crate) unsafe fn clear_mask(irq: u8) {
    assert!(irq < 16);
    if irq < 8 {
        MASTER_PIC.lock().clear_mask(irq);
    } else {
        SLAVE_PIC.lock().clear_mask(irq - 8);
    }
}
