//! `guardcov_targets` contains the runtime for sancov `trace-pc-guard` edge counters,
//! injected in the target itself during compilation.
//!
//! Link the static library built with the `sancov_pcguard` feature into a program compiled with
//! `-fsanitize-coverage=trace-pc-guard`. The harness then reads the counters through
//! `get_guard_count` and `get_guard_values`.
#![no_std]
#![cfg_attr(not(test), warn(
    missing_debug_implementations,
    missing_docs,
    //trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    //unused_results
))]
#![cfg_attr(test, deny(
    missing_debug_implementations,
    //trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_must_use,
    //unused_results
))]
#![cfg_attr(
    test,
    deny(
        bad_style,
        dead_code,
        improper_ctypes,
        non_shorthand_field_patterns,
        no_mangle_generic_items,
        overflowing_literals,
        path_statements,
        patterns_in_fns_without_body,
        unconditional_recursion,
        unused,
        unused_allocation,
        unused_comparisons,
        unused_parens,
        while_true
    )
)]

#[cfg(any(test, feature = "std"))]
#[macro_use]
extern crate std;

#[allow(unused_imports)]
#[macro_use]
extern crate alloc;

pub mod guards;
pub use guards::*;

pub mod sancov_pcguard;
pub use sancov_pcguard::*;

pub mod export;
pub use export::*;
