//! Replacement for `__libc_start_main`, the function glibc's `_start` calls
//! to reach `main`. Resolved locally (see [`crate::symbols::SymbolTable`])
//! so the guest's own startup code calls back into the loader instead of
//! the host's real libc bootstrap.
use std::os::raw::{c_char, c_int};

use tracing::trace;

use crate::argv;

type GuestMain = extern "C" fn(c_int, *mut *mut c_char, *mut *mut c_char) -> c_int;

/// Takes the place of `__libc_start_main`. Discards the `argc`/`argv` the
/// guest's `_start` passes in (they describe the host's own invocation) and
/// substitutes the relay installed by [`crate::argv::install`], then calls
/// the guest's `main` and exits with its return code. Never returns.
pub extern "C" fn libc_start_main_shim(
    entry: GuestMain,
    _argc: c_int,
    _argv: *mut *mut c_char,
) -> ! {
    let (argc, argv) = argv::get();
    trace!(argc, "entering guest main via libc_start_main shim");
    let code = entry(argc, argv, std::ptr::null_mut());
    unsafe { libc::exit(code) }
}
