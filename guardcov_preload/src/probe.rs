//! Prints the number of guards of the target instead of running it.
//!
//! The harness runs the target once with this library preloaded to size its shared map.
//! The target's `main` never runs, but its sancov constructors already did.

#[cfg(not(test))]
use core::ffi::c_void;
use std::io::{self, Write};

use libafl_bolts::Error;
use libc::{c_char, c_int, EXIT_FAILURE, EXIT_SUCCESS};

#[cfg(not(test))]
use crate::libc_start::{orig_libc_start_main, FiniFunc, InitFunc};
use crate::libc_start::{target_get_guard_count, GetGuardCountFunc, MainFunc};

/// Writes `count` as a single line to `out`.
pub fn report_guard_count<W: Write>(out: &mut W, count: usize) -> Result<(), Error> {
    writeln!(out, "{count}")?;
    out.flush()?;
    Ok(())
}

fn print_guard_count(get_guard_count: GetGuardCountFunc) -> Result<usize, Error> {
    let count = unsafe { get_guard_count() };
    report_guard_count(&mut io::stdout().lock(), count)?;
    Ok(count)
}

/// Runs in place of the target's `main`.
pub unsafe extern "C" fn main_hook(
    _argc: c_int,
    _argv: *mut *mut c_char,
    _env: *mut *mut c_char,
) -> c_int {
    match target_get_guard_count().and_then(print_guard_count) {
        Ok(count) => {
            log::info!("Target has {count} guards");
            EXIT_SUCCESS
        }
        Err(err) => {
            log::error!("Could not report the guard count: {err}");
            EXIT_FAILURE
        }
    }
}

/// Sets up logging, only to the file named in the environment, and returns the `main` to run instead of the target's.
pub fn prepare() -> MainFunc {
    crate::setup_logging(None);
    main_hook
}

/// Hooks the start of the target to run [`main_hook`] in place of its `main`.
#[cfg(not(test))]
#[no_mangle]
#[allow(clippy::similar_names)]
pub unsafe extern "C" fn __libc_start_main(
    _main: MainFunc,
    argc: c_int,
    argv: *mut *const c_char,
    init: InitFunc,
    fini: FiniFunc,
    rtld_fini: FiniFunc,
    stack_end: *mut c_void,
) -> c_int {
    let main = prepare();

    match orig_libc_start_main() {
        Ok(orig) => orig(main, argc, argv, init, fini, rtld_fini, stack_end),
        Err(err) => {
            log::error!("{err}");
            libc::abort()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::{main_hook, prepare, print_guard_count, report_guard_count};
    use crate::{config::DEFAULT_LOG_FILE, libc_start::MainFunc};

    #[test]
    fn test_report_guard_count() {
        let mut out = Vec::new();
        report_guard_count(&mut out, 4242).unwrap();
        assert_eq!(out, b"4242\n");
    }

    unsafe extern "C" fn fake_guard_count() -> usize {
        17
    }

    #[test]
    fn test_print_guard_count() {
        assert_eq!(print_guard_count(fake_guard_count).unwrap(), 17);
    }

    #[test]
    #[serial]
    fn test_prepare_skips_default_log_file() {
        let cwd = env::current_dir().unwrap();
        let default_log = cwd.join(DEFAULT_LOG_FILE);
        let existed = default_log.exists();

        let main = prepare();
        assert_eq!(main as usize, main_hook as MainFunc as usize);
        // only the redirect mode falls back to a default log file
        assert_eq!(default_log.exists(), existed);
    }
}
