//! Looking up functions of the target and of the next library in the link chain with `dlsym`.

use core::{
    ffi::{c_void, CStr},
    mem::{size_of, transmute_copy},
};

use libafl_bolts::Error;
use libc::{dlerror, dlsym, RTLD_DEFAULT, RTLD_NEXT};

/// Where [`get_symbol`] starts searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// All loaded objects in load order, starting with the executable.
    Global,
    /// Objects loaded after this library, used to find the function we interpose.
    Next,
}

impl SymbolScope {
    fn handle(self) -> *mut c_void {
        match self {
            Self::Global => RTLD_DEFAULT,
            Self::Next => RTLD_NEXT,
        }
    }
}

/// Resolves `name` in `scope` and reinterprets the address as `T`, usually a function pointer.
///
/// # Safety
/// `T` has to be the exact type of the symbol, calling it with any other signature is undefined behavior.
pub unsafe fn get_symbol<T>(name: &CStr, scope: SymbolScope) -> Result<T, Error> {
    if size_of::<T>() != size_of::<*mut c_void>() {
        return Err(Error::illegal_argument(format!(
            "Symbol {name:?} can only be loaded as a pointer-sized type, not {} bytes",
            size_of::<T>()
        )));
    }

    let symbol_pointer: *mut c_void = dlsym(scope.handle(), name.as_ptr());
    if symbol_pointer.is_null() {
        return Err(Error::unknown(format!(
            "Could not load symbol {name:?}: {}",
            last_dl_error()
        )));
    }
    Ok(transmute_copy(&symbol_pointer))
}

fn last_dl_error() -> String {
    let err = unsafe { dlerror() };
    if err.is_null() {
        "no dlerror".to_string()
    } else {
        unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
    }
}
