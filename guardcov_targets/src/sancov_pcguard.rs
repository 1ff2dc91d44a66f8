//! [`LLVM` `PcGuard`](https://clang.llvm.org/docs/SanitizerCoverage.html#tracing-pcs-with-guards) runtime for `guardcov`.
//!
//! Holds the single, process-wide [`GuardTable`] the sancov callbacks write to.
//! Only one table is tracked: each non-empty `__sanitizer_cov_trace_pc_guard_init` call replaces the previous one.
//! The unmangled symbols are emitted with the `sancov_pcguard` feature only.

use core::ptr::{self, addr_of, addr_of_mut, NonNull};

use crate::guards::{increment_guard, GuardTable};

/// The guard table of the most recently initialized module.
static mut GUARD_TABLE: GuardTable = GuardTable::new();

/// Callback for sancov `pc_guard` - usually called by `llvm` on each block or edge.
///
/// # Safety
/// Dereferences `guard` and writes to it. The guard is not checked against the recorded table.
/// Should usually not be called directly.
#[cfg_attr(feature = "sancov_pcguard", no_mangle)]
pub unsafe extern "C" fn __sanitizer_cov_trace_pc_guard(guard: *mut u32) {
    increment_guard(guard);
    #[cfg(feature = "log_cov")]
    log::trace!("Updated guard {guard:p} to {}", *guard);
}

/// Initialize the sancov `pc_guard` - usually called by `llvm`, once per instrumented module.
///
/// # Safety
/// Dereferences every guard in `[start, stop)` and writes to it.
#[cfg_attr(feature = "sancov_pcguard", no_mangle)]
pub unsafe extern "C" fn __sanitizer_cov_trace_pc_guard_init(start: *mut u32, stop: *mut u32) {
    let table = &mut *addr_of_mut!(GUARD_TABLE);
    if !table.init(start, stop) {
        #[cfg(feature = "log_cov")]
        log::debug!("Skipping initialization of an empty guard range at {start:p}");
        return;
    }
    #[cfg(feature = "log_cov")]
    log::debug!(
        "Initialized {} guards with start {start:p} and stop {stop:p}",
        table.len()
    );
}

/// Returns the number of guards of the current table, for the harness.
#[cfg_attr(feature = "sancov_pcguard", no_mangle)]
pub extern "C" fn get_guard_count() -> usize {
    let count = guard_count();
    #[cfg(feature = "log_cov")]
    log::debug!("Returned guard count {count}");
    count
}

/// Returns the first guard of the current table, for the harness, or null if there is none.
#[cfg_attr(feature = "sancov_pcguard", no_mangle)]
pub extern "C" fn get_guard_values() -> *mut u32 {
    let values = guard_values().map_or(ptr::null_mut(), NonNull::as_ptr);
    #[cfg(feature = "log_cov")]
    log::debug!("Returned guard values {values:p}");
    values
}

/// The number of guards of the current table, `0` if no module registered any.
#[must_use]
pub fn guard_count() -> usize {
    guard_table().len()
}

/// The first guard of the current table, `None` if no module registered any.
#[must_use]
pub fn guard_values() -> Option<NonNull<u32>> {
    guard_table().start()
}

/// A copy of the bounds of the current guard table.
#[must_use]
pub fn guard_table() -> GuardTable {
    // # Safety
    // Only the bounds are copied. The guards themselves are not read.
    unsafe { *addr_of!(GUARD_TABLE) }
}

/// Forgets the current guard table, as if no module had been initialized.
#[cfg(test)]
pub(crate) fn reset_guard_table() {
    unsafe { *addr_of_mut!(GUARD_TABLE) = GuardTable::new() };
}
