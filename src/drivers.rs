//! Boot-time driver bring-up, table driven.

struct KnownDriver {
    name: &'static str,
    init: fn(),
}

#[cfg(target_arch = "x86")]
static KNOWN_DRIVERS: [KnownDriver; 2] = [
    KnownDriver {
        name: "serial",
        init: crate::logging::init_serial,
    },
    KnownDriver {
        name: "pit",
        init: crate::arch::x86::pit::init,
    },
];

#[cfg(not(target_arch = "x86"))]
static KNOWN_DRIVERS: [KnownDriver; 0] = [];

pub(crate) fn init_all() {
    for driver in &KNOWN_DRIVERS {
        (driver.init)();
        log::info!("driver up: {}", driver.name);
    }
}
