//! Signatures around `__libc_start_main`, the entry point interposed by the preload modes.

use core::ffi::c_void;

use libafl_bolts::Error;
use libc::{c_char, c_int};

use crate::symbols::{get_symbol, SymbolScope};

/// `main` of the target, as passed to `__libc_start_main`.
pub type MainFunc = unsafe extern "C" fn(c_int, *mut *mut c_char, *mut *mut c_char) -> c_int;

/// The `init` and `fini` hooks of the target. Newer glibc versions pass null for both.
pub type InitFunc = Option<unsafe extern "C" fn(c_int, *mut *mut c_char, *mut *mut c_char)>;

/// A destructor registered at exit, like `fini` or the dynamic linker's `rtld_fini`.
pub type FiniFunc = Option<unsafe extern "C" fn()>;

/// The signature of glibc's `__libc_start_main`.
pub type LibcStartMainFunc = unsafe extern "C" fn(
    MainFunc,
    c_int,
    *mut *const c_char,
    InitFunc,
    FiniFunc,
    FiniFunc,
    *mut c_void,
) -> c_int;

/// `get_guard_count` exported by the instrumented target.
pub type GetGuardCountFunc = unsafe extern "C" fn() -> usize;

/// `get_guard_values` exported by the instrumented target.
pub type GetGuardValuesFunc = unsafe extern "C" fn() -> *const u32;

/// The real `__libc_start_main`, next in line after this library.
pub fn orig_libc_start_main() -> Result<LibcStartMainFunc, Error> {
    // # Safety
    // The signature matches glibc's declaration.
    unsafe { get_symbol(c"__libc_start_main", SymbolScope::Next) }
}

/// The guard count accessor of the target.
pub fn target_get_guard_count() -> Result<GetGuardCountFunc, Error> {
    unsafe { get_symbol(c"get_guard_count", SymbolScope::Global) }
}

/// The guard values accessor of the target.
pub fn target_get_guard_values() -> Result<GetGuardValuesFunc, Error> {
    unsafe { get_symbol(c"get_guard_values", SymbolScope::Global) }
}

/// Reads the guard table of the target through its exported accessors.
///
/// # Safety
/// The target's guard table must stay alive and untouched while the returned slice is in use.
pub unsafe fn target_guards<'a>() -> Result<&'a [u32], Error> {
    let count = target_get_guard_count()?();
    let values = target_get_guard_values()?();
    if count == 0 {
        return Ok(&[]);
    }
    if values.is_null() {
        return Err(Error::illegal_state(format!(
            "Target reported {count} guards, but no guard table"
        )));
    }
    Ok(core::slice::from_raw_parts(values, count))
}

#[cfg(test)]
mod tests {
    use super::orig_libc_start_main;

    #[test]
    fn test_libc_start_main_is_found() {
        // Without interposition, the next definition is glibc's own
        assert!(orig_libc_start_main().is_ok());
    }
}
