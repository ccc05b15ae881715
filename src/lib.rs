#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

mod arch;
mod drivers;
mod fs;
mod locks;
mod logging;
mod multiboot;

/// Name of the program launched once bring-up finishes.
const FIRST_PROGRAM: &str = "init";
/// Where its image is copied; inside the identity-mapped low 4MB.
const FIRST_PROGRAM_LOAD: usize = 0x0030_0000;
/// Top of its ring-3 stack, just under the kernel image.
const FIRST_USER_STACK_TOP: u32 = 0x0040_0000;

#[cfg(target_arch = "x86")]
mod boot {
    use crate::arch::x86::{gdt, halt_loop, interrupts, paging, pic, process};
    use crate::{drivers, fs, logging, multiboot};
    use crate::{FIRST_PROGRAM, FIRST_PROGRAM_LOAD, FIRST_USER_STACK_TOP};

    /// Called by the boot stub with interrupts off, segments flat, paging
    /// disabled. EAX/EBX arrive here as the two arguments.
    #[no_mangle]
    pub extern "C" fn entry(magic: u32, info_addr: u32) -> ! {
        logging::init();

        if magic != multiboot::BOOTLOADER_MAGIC {
            log::error!("bad bootloader magic {:#x}", magic);
            halt_loop();
        }
        // SAFETY: the magic check established that EBX carries the info record
        let info = unsafe { multiboot::MultibootInfo::new(info_addr as usize) };
        multiboot::log_boot_info(&info);

        unsafe {
            gdt::init();
            paging::enable_basic_paging();

            pic::remap();
            // everything masked until its driver is up
            for irq in 0..16 {
                pic::set_mask(irq);
            }
        }
        interrupts::init();
        drivers::init_all();

        // the timer may tick on the boot stack from here on; with no
        // current thread the decision path just resumes in place
        crate::arch::enable_interrupts();

        launch_first_program();
    }

    fn launch_first_program() -> ! {
        let dentry = match fs::read_dentry_by_name(FIRST_PROGRAM) {
            Some(dentry) => dentry,
            None => {
                log::error!("no '{}' image", FIRST_PROGRAM);
                halt_loop();
            }
        };
        let len = dentry.data.len();
        // SAFETY: the load window is identity-mapped and nothing lives there
        let dst = unsafe { core::slice::from_raw_parts_mut(FIRST_PROGRAM_LOAD as *mut u8, len) };
        if fs::read_data(&dentry, 0, dst) != Some(len) {
            log::error!("short read loading '{}'", FIRST_PROGRAM);
            halt_loop();
        }

        let esp0;
        {
            let mut table = process::PROCESS_TABLE.lock();
            let pid = match table.create_paused(None) {
                Some(pid) => pid,
                None => {
                    log::error!("process table full at boot");
                    halt_loop();
                }
            };
            {
                let desc = table.get_mut(pid).unwrap();
                desc.entry_point = FIRST_PROGRAM_LOAD;
                desc.code_selector = gdt::USER_CS_SEL;
                desc.user_stack = Some((gdt::USER_DS_SEL, FIRST_USER_STACK_TOP));
            }
            table.make_runnable(pid);
            table.start(pid);
            table.current = Some(pid);

            esp0 = table.get(pid).unwrap().main_thread.esp0;
            gdt::set_kernel_stack(table.kstack_top(pid));
            log::info!("launching '{}' as {:?}", FIRST_PROGRAM, pid);
        }

        // SAFETY: esp0 addresses a fully built launch frame; this never returns
        unsafe { launch(esp0) }
    }

    /// Abandon the boot stack and unwind into a launch frame. The iretd
    /// drops to ring 3 with the flags the frame carries.
    unsafe fn launch(esp0: usize) -> ! {
        core::arch::asm!(
            "mov esp, {0}",
            "popad",
            "pop eax",
            "iretd",
            in(reg) esp0,
            options(noreturn),
        )
    }
}


#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("{}", info);
    loop {}
}
