use crate::arch::x86::gdt::KERNEL_CS_SEL;

pub(super) type HandlerFn = extern "C" fn();

pub(super) const IDT_ENTRIES: usize = 256;

/// One 32-bit gate descriptor: handler offset split low/high around the code
/// selector and the type/attribute byte (P, DPL, gate type).
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub(super) struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl GateDescriptor {
    pub(super) fn new(handler: u32, options: Options) -> Self {
        Self {
            offset_low: handler as u16,
            selector: KERNEL_CS_SEL,
            zero: 0,
            type_attr: options.into(),
            offset_high: (handler >> 16) as u16,
        }
    }

    pub(super) fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: KERNEL_CS_SEL,
            zero: 0,
            type_attr: Options::minimal().into(),
            offset_high: 0,
        }
    }

    #[cfg(test)]
    fn offset(&self) -> u32 {
        self.offset_low as u32 | (self.offset_high as u32) << 16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Options {
    pub(super) gate_type: GateType,
    pub(super) dpl: u8,
    pub(super) present: bool,
}

impl Options {
    fn minimal() -> Self {
        Self {
            gate_type: GateType::Interrupt,
            dpl: 0,
            present: false,
        }
    }

    /// Kernel-only interrupt gate: the default for exceptions and IRQs.
    pub(super) fn kernel_interrupt() -> Self {
        Self {
            gate_type: GateType::Interrupt,
            dpl: 0,
            present: true,
        }
    }

    /// User-invokable interrupt gate, for the syscall vector. Interrupt (not
    /// trap) type: IF stays clear while the canonical frame is live, which is
    /// what keeps the nesting-depth accounting honest.
    pub(super) fn user_interrupt() -> Self {
        Self {
            gate_type: GateType::Interrupt,
            dpl: 3,
            present: true,
        }
    }
}

impl From<Options> for u8 {
    fn from(value: Options) -> Self {
        (value.present as u8) << 7 | value.dpl << 5 | value.gate_type as u8
    }
}

impl From<u8> for Options {
    fn from(value: u8) -> Self {
        Self {
            gate_type: GateType::try_from(value & 0xf).unwrap(),
            dpl: (value >> 5) & 0b11,
            present: value >> 7 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(super) enum GateType {
    // IF is cleared on entry through an interrupt gate, preserved through a
    // trap gate
    Interrupt = 0xe,
    Trap = 0xf,
}

impl TryFrom<u8> for GateType {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xe => Ok(Self::Interrupt),
            0xf => Ok(Self::Trap),
            _ => Err(value),
        }
    }
}

#[repr(C, align(16))]
pub(super) struct InterruptDescriptorTable([GateDescriptor; IDT_ENTRIES]);

impl InterruptDescriptorTable {
    pub(super) fn new() -> Self {
        Self([GateDescriptor::missing(); IDT_ENTRIES])
    }

    pub(super) fn add_handler(&mut self, vector: usize, handler: HandlerFn) {
        self.add_handler_with(vector, handler, Options::kernel_interrupt());
    }

    pub(super) fn add_handler_with(&mut self, vector: usize, handler: HandlerFn, options: Options) {
        self.0[vector] = GateDescriptor::new(handler as usize as u32, options);
    }

    #[cfg(target_arch = "x86")]
    pub(super) fn load(&'static self) {
        let dtp = DescriptorTablePointer {
            limit: (core::mem::size_of::<Self>() - 1) as u16,
            base: self as *const _ as u32,
        };
        unsafe {
            core::arch::asm!("lidt [{}]", in(reg) &dtp, options(readonly, nostack, preserves_flags));
        }
    }
}

#[cfg(target_arch = "x86")]
#[repr(C, packed)]
struct DescriptorTablePointer {
    limit: u16,
    base: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_attr_byte_round_trips() {
        for options in [
            Options::kernel_interrupt(),
            Options::user_interrupt(),
            Options::minimal(),
        ] {
            let byte: u8 = options.into();
            assert_eq!(Options::from(byte), options);
        }
    }

    #[test]
    fn syscall_gate_is_user_invokable() {
        let byte: u8 = Options::user_interrupt().into();
        // P=1, DPL=3, 32-bit interrupt gate
        assert_eq!(byte, 0xee);
    }

    #[test]
    fn descriptor_splits_handler_offset() {
        let desc = GateDescriptor::new(0xcafe_f00d, Options::kernel_interrupt());
        assert_eq!(desc.offset(), 0xcafe_f00d);
    }

    #[test]
    fn missing_descriptor_is_not_present() {
        let desc = GateDescriptor::missing();
        let type_attr = desc.type_attr;
        assert!(!Options::from(type_attr).present);
    }
}
