pub(crate) mod entry;
pub(crate) mod idt;
#[cfg(target_arch = "x86")]
mod vectors;

/// Installs the interrupt descriptor table. Interrupts stay disabled until
/// the boot path explicitly turns them on.
#[cfg(target_arch = "x86")]
pub(crate) fn init() {
    vectors::init();
    log::info!("idt loaded");
}
