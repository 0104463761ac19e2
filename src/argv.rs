//! Relays the guest's argv from the host `main` to the
//! [`crate::shim::libc_start_main_shim`] replacement, since the shim is
//! invoked by the guest's own startup code and receives no arguments of its
//! own choosing.
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::OnceLock;

/// Leaked, null-terminated `argv` vector plus its count, installed once by
/// `main` before the guest is ever mapped.
pub struct ArgvRelay {
    argc: i32,
    argv: *mut *mut c_char,
}

// SAFETY: `argv`/`argc` are installed once, before the guest runs, and never
// mutated afterwards; the pointed-to memory is intentionally leaked for the
// lifetime of the process.
unsafe impl Send for ArgvRelay {}
unsafe impl Sync for ArgvRelay {}

static RELAY: OnceLock<ArgvRelay> = OnceLock::new();

/// Leaks `args` as a C-style `argv` array and installs it as the process-wide
/// relay. Must be called exactly once, before the guest's entry point runs.
pub fn install(args: &[String]) {
    let mut ptrs: Vec<*mut c_char> = args
        .iter()
        .map(|arg| CString::new(arg.as_str()).expect("argv must not contain NUL").into_raw())
        .collect();
    ptrs.push(std::ptr::null_mut());
    let argc = args.len() as i32;
    let argv = Box::leak(ptrs.into_boxed_slice()).as_mut_ptr();
    RELAY
        .set(ArgvRelay { argc, argv })
        .unwrap_or_else(|_| panic!("argv relay installed more than once"));
}

/// Returns the relay installed by [`install`]. Panics if called before
/// installation -- a programmer error, not a runtime condition.
pub fn get() -> (i32, *mut *mut c_char) {
    let relay = RELAY.get().expect("argv relay not installed");
    (relay.argc, relay.argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_round_trips_argv() {
        // Each #[test] runs in its own thread, so a fresh OnceLock per test
        // binary invocation is fine; this is the only test touching RELAY.
        install(&["guest".to_string(), "arg1".to_string()]);
        let (argc, argv) = get();
        assert_eq!(argc, 2);
        unsafe {
            let first = std::ffi::CStr::from_ptr(*argv.offset(0));
            assert_eq!(first.to_str().unwrap(), "guest");
            let second = std::ffi::CStr::from_ptr(*argv.offset(1));
            assert_eq!(second.to_str().unwrap(), "arg1");
            assert!((*argv.offset(2)).is_null());
        }
    }
}
