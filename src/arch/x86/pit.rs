use super::pic;
use super::port::Port;
use log::info;

const CHANNEL0_PORT: u16 = 0x40;
const COMMAND_PORT: u16 = 0x43;

// channel 0, lobyte/hibyte access, mode 3 (square wave), binary counting
const COMMAND_WORD: u8 = 0x36;

const PIT_BASE_HZ: u32 = 1_193_182;
// preemption tick rate
pub(crate) const TICK_HZ: u32 = 100;

// Program the 8253/8254 channel 0 as the scheduler's preemption source and
// unmask its interrupt line. Every tick from here on re-enters the kernel
// through the timer trampoline.
pub(crate) fn init() {
    let divisor = (PIT_BASE_HZ / TICK_HZ) as u16;

    unsafe {
        Port::new(COMMAND_PORT).write(COMMAND_WORD);
        let mut channel0 = Port::new(CHANNEL0_PORT);
        channel0.write(divisor as u8);
        channel0.write((divisor >> 8) as u8);

        pic::clear_mask(0);
    }

    info!("PIT ticking at {} Hz", TICK_HZ);
}
