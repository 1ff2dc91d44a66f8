//! Copies the guards of the target into a shared map at exit.
//!
//! The harness appends the JSON [`ShMemDescription`] of its map as the last argument.
//! The interposed `__libc_start_main` removes it again, and replaces the dynamic linker's
//! `rtld_fini` with [`write_guards`], which runs after the target's `main` returned.

use core::ptr::{addr_of, addr_of_mut};
#[cfg(not(test))]
use std::path::Path;
use std::panic::catch_unwind;

use guardcov_targets::{copy_guards_to_map, ExportMode};
use libafl_bolts::{
    shmem::{MmapShMemProvider, ShMemDescription, ShMemProvider},
    Error,
};
#[cfg(not(test))]
use libc::c_void;
use libc::{c_char, c_int};

#[cfg(not(test))]
use crate::{
    config::DEFAULT_LOG_FILE,
    libc_start::{orig_libc_start_main, InitFunc, MainFunc},
    setup_logging,
};
use crate::{
    args::take_description,
    libc_start::{target_guards, FiniFunc},
};

static mut SHMEM_DESCRIPTION: Option<ShMemDescription> = None;
static mut RTLD_FINI: FiniFunc = None;
static mut EXPORT_MODE: ExportMode = ExportMode::Truncate;

/// Maps the shared memory of `description` and copies `guards` into it.
pub fn export_guards_to_shmem(
    description: ShMemDescription,
    guards: &[u32],
    mode: ExportMode,
) -> Result<(), Error> {
    let mut shmem = MmapShMemProvider::new()?.shmem_from_description(description)?;
    copy_guards_to_map(guards, &mut shmem, mode)
}

/// Copies `guards` to the shared map remembered by [`install`].
///
/// # Safety
/// Must not race with [`install`].
unsafe fn export_installed(guards: &[u32]) -> Result<(), Error> {
    let description = (*addr_of!(SHMEM_DESCRIPTION))
        .ok_or_else(|| Error::empty_optional("No shared memory description was saved"))?;
    export_guards_to_shmem(description, guards, *addr_of!(EXPORT_MODE))
}

/// Exports the target's guards to the shared map remembered at startup, returns how many were written.
///
/// # Safety
/// Must not race with [`install`], and the target's guard table must still be mapped.
unsafe fn redirect_guards() -> Result<usize, Error> {
    let guards = target_guards()?;
    export_installed(guards)?;
    Ok(guards.len())
}

/// Remembers what [`write_guards`] needs at exit.
///
/// # Safety
/// Writes to process-wide state, call it before the target starts any threads.
pub unsafe fn install(description: Option<ShMemDescription>, mode: ExportMode, rtld_fini: FiniFunc) {
    *addr_of_mut!(SHMEM_DESCRIPTION) = description;
    *addr_of_mut!(EXPORT_MODE) = mode;
    *addr_of_mut!(RTLD_FINI) = rtld_fini;
}

/// Runs in place of `rtld_fini`: exports the guards, then hands over to the original `rtld_fini`.
///
/// # Safety
/// Only to be called once, at process exit.
pub unsafe extern "C" fn write_guards() {
    match catch_unwind(|| unsafe { redirect_guards() }) {
        Ok(Ok(count)) => log::info!("Exported {count} guards"),
        Ok(Err(err)) => log::error!("Could not export guards: {err}"),
        Err(panic) => {
            let msg = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = panic.downcast_ref::<String>() {
                msg.clone()
            } else {
                "Panic occurred but the message is not a string.".to_string()
            };
            log::error!("Panic while exporting guards: {msg}");
        }
    }

    match *addr_of!(RTLD_FINI) {
        Some(rtld_fini) => rtld_fini(),
        None => log::warn!("No rtld_fini to hand over to"),
    }
}

/// Takes the shared map description off `argv` and remembers what [`write_guards`] needs.
///
/// A missing or malformed description leaves `argc` and `argv` untouched and disables the export.
/// Returns the function to pass to glibc as `rtld_fini`.
///
/// # Safety
/// `argv` has to hold at least `argc` valid entries. Writes to process-wide state, like [`install`].
pub unsafe fn prepare(
    argc: &mut c_int,
    argv: *mut *const c_char,
    mode: ExportMode,
    rtld_fini: FiniFunc,
) -> FiniFunc {
    let description = match take_description(argc, argv) {
        Ok(description) => Some(description),
        Err(err) => {
            log::error!("Not exporting guards: {err}");
            None
        }
    };
    install(description, mode, rtld_fini);
    Some(write_guards)
}

/// Hooks the start of the target: strips the shared map description and installs [`write_guards`].
#[cfg(not(test))]
#[no_mangle]
#[allow(clippy::similar_names)]
pub unsafe extern "C" fn __libc_start_main(
    main: MainFunc,
    mut argc: c_int,
    argv: *mut *const c_char,
    init: InitFunc,
    fini: FiniFunc,
    rtld_fini: FiniFunc,
    stack_end: *mut c_void,
) -> c_int {
    let config = setup_logging(Some(Path::new(DEFAULT_LOG_FILE)));
    let rtld_fini = prepare(&mut argc, argv, config.export_mode, rtld_fini);

    match orig_libc_start_main() {
        Ok(orig) => orig(main, argc, argv, init, fini, rtld_fini, stack_end),
        Err(err) => {
            log::error!("{err}");
            libc::abort()
        }
    }
}
