//! The hand-curated table of symbols the relocator resolves locally before
//! falling back to the host dynamic linker.
use std::ffi::c_void;

use libc::FILE;

extern "C" {
    static mut stdin: *mut FILE;
    static mut stdout: *mut FILE;
    static mut stderr: *mut FILE;
}

/// One statically-known relocation target: a name and the address it
/// resolves to. Bound lazily so the `stdin`/`stdout`/`stderr` globals are
/// read only once, at relocation time.
struct Binding {
    name: &'static str,
    addr: *mut c_void,
}

/// Fixed, ordered symbol table mirroring the original loader's hand-written
/// list: `stdin`, `stdout`, `stderr`, `__libc_start_main`. Resolution is a
/// prefix match bounded by the *stored* name's length, not the looked-up
/// name's -- so a guest relocation against `stdinfoo` spuriously matches
/// `stdin`. Preserved exactly; see DESIGN.md.
pub struct SymbolTable {
    bindings: Vec<Binding>,
}

impl SymbolTable {
    /// Builds the table. Must run after the guest's segments are mapped so
    /// `__libc_start_main` can point at [`crate::shim::libc_start_main_shim`].
    pub fn new(libc_start_main_shim: *mut c_void) -> Self {
        let bindings = unsafe {
            vec![
                Binding {
                    name: "stdin",
                    addr: stdin as *mut c_void,
                },
                Binding {
                    name: "stdout",
                    addr: stdout as *mut c_void,
                },
                Binding {
                    name: "stderr",
                    addr: stderr as *mut c_void,
                },
                Binding {
                    name: "__libc_start_main",
                    addr: libc_start_main_shim,
                },
            ]
        };
        Self { bindings }
    }

    /// Resolves `name` against the local table by prefix match, bounded by
    /// the stored binding's name length.
    pub fn resolve(&self, name: &str) -> Option<*mut c_void> {
        self.bindings
            .iter()
            .find(|binding| {
                name.len() >= binding.name.len() && &name[..binding.name.len()] == binding.name
            })
            .map(|binding| binding.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_is_bounded_by_stored_name() {
        let table = SymbolTable::new(std::ptr::null_mut());
        assert!(table.resolve("stdinfoo").is_some());
        assert!(table.resolve("stdi").is_none());
        assert!(table.resolve("nonexistent_symbol").is_none());
    }
}
