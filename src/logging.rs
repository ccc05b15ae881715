use log::{LevelFilter, Metadata, Record};

struct Logger;

static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        crate::println!(
            "[{}:{}] {}",
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Route the `log` macros to the serial port. Safe to call before the port
/// is configured; bytes just land on the bus unconfigured until `init_serial`
/// runs.
pub(crate) fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        $crate::logging::_print_port(format_args!($($arg)*));
    });
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[cfg(target_arch = "x86")]
const COM1: u16 = 0x3f8;

#[cfg(target_arch = "x86")]
struct PortWriter(u16);

#[cfg(target_arch = "x86")]
impl PortWriter {
    fn write_byte(&self, b: u8) {
        unsafe {
            core::arch::asm!("out dx, al", in("dx") self.0, in("al") b);
        }
    }
}

#[cfg(target_arch = "x86")]
impl core::fmt::Write for PortWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            match byte {
                // printable ASCII byte or newline
                0x20..=0x7e | b'\n' => self.write_byte(byte),
                // not part of printable ASCII range
                _ => self.write_byte(0xfe),
            }
        }
        Ok(())
    }
}

#[cfg(target_arch = "x86")]
pub fn _print_port(args: core::fmt::Arguments) {
    use core::fmt::Write;
    PortWriter(COM1).write_fmt(args).unwrap();
}

#[cfg(not(target_arch = "x86"))]
pub fn _print_port(args: core::fmt::Arguments) {
    let _ = args;
}

/// 115200 8N1, FIFOs on. The usual COM1 bring-up sequence.
#[cfg(target_arch = "x86")]
pub(crate) fn init_serial() {
    use crate::arch::x86::port::Port;

    unsafe {
        Port::new(COM1 + 1).write(0x00u8); // no interrupts
        Port::new(COM1 + 3).write(0x80u8); // DLAB on
        Port::new(COM1).write(0x01u8); // divisor 1: 115200 baud
        Port::new(COM1 + 1).write(0x00u8);
        Port::new(COM1 + 3).write(0x03u8); // DLAB off, 8N1
        Port::new(COM1 + 2).write(0xc7u8); // FIFOs enabled and cleared
        Port::new(COM1 + 4).write(0x0bu8); // DTR, RTS, OUT2
    }
    log::info!("serial console on COM1");
}
