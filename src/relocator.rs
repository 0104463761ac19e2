//! Applies dynamic relocations against the mapped guest image, resolving
//! symbols through the local table first and the host dynamic linker second.
use std::ffi::{c_void, CStr, CString};

use libc::{dlsym, RTLD_DEFAULT};
use tracing::{trace, warn};

use crate::{
    error::LoaderError,
    image::ParsedImage,
    reader::Reader,
    reloc::{Rela, RelType},
    symbols::SymbolTable,
    BASE,
};

const RELA_SIZE: u64 = 24;

/// Reads the symbol name for dynamic symbol index `r_sym` out of the
/// scratch image's symbol and string tables.
unsafe fn symbol_name(image: &ParsedImage, r_sym: u32) -> Result<String, LoaderError> {
    let entry_ptr = image.dyn_symtab.add(r_sym as usize * 24);
    let bytes = std::slice::from_raw_parts(entry_ptr, 24);
    let mut reader = Reader::from_bytes(bytes);
    let sym = crate::sym::SymbolEntry::parse(&mut reader)?;
    let name_ptr = image.dyn_strtab.add(sym.st_name() as usize) as *const i8;
    Ok(CStr::from_ptr(name_ptr).to_string_lossy().into_owned())
}

/// Resolves `name` against the local table, falling back to the host
/// dynamic linker via `dlsym(RTLD_DEFAULT, ...)`.
fn resolve(symbols: &SymbolTable, name: &str) -> Option<*mut c_void> {
    if let Some(addr) = symbols.resolve(name) {
        return Some(addr);
    }
    let cname = CString::new(name).ok()?;
    let addr = unsafe { dlsym(RTLD_DEFAULT, cname.as_ptr()) };
    if addr.is_null() {
        None
    } else {
        Some(addr)
    }
}

fn apply_one(image: &ParsedImage, symbols: &SymbolTable, rela: &Rela) -> Result<(), LoaderError> {
    // Resolved and checked before the type dispatch below, for every entry
    // (including R_X86_64_RELATIVE, whose r_sym is conventionally 0 / the
    // empty name) -- matches the original's `resolve_reloc_symbol` followed
    // by `if (!(*symbol_name)) continue;`, which runs unconditionally ahead
    // of its relocation-type switch.
    let name = unsafe { symbol_name(image, rela.r_sym)? };
    if name.is_empty() {
        return Ok(());
    }

    let target = (BASE + Into::<u64>::into(rela.r_offset)) as *mut u64;

    match rela.r_type {
        RelType::Relative => {
            let value = BASE.wrapping_add(rela.r_addend);
            unsafe { *target = (*target).wrapping_add(value) };
            trace!(target = format!("{:#x}", target as u64), value = format!("{:#x}", value), "R_X86_64_RELATIVE");
        }
        RelType::Copy | RelType::GlobDat | RelType::JumpSlot => match resolve(symbols, &name) {
            Some(addr) => {
                // Implemented as a pointer assignment, not a byte-for-byte
                // copy of the referenced object, for every one of these
                // relocation kinds including R_X86_64_COPY. Preserved
                // from the original loader; see DESIGN.md.
                unsafe { *target = addr as u64 };
                trace!(%name, target = format!("{:#x}", target as u64), r_type = ?rela.r_type, "resolved relocation");
            }
            None => warn!(%name, "could not resolve relocation symbol; left unpatched"),
        },
        _ => trace!(r_type = ?rela.r_type, "ignoring relocation type"),
    }

    Ok(())
}

/// Walks `size_bytes` worth of `Elf64_Rela` entries starting
/// `start_entry` entries past `BASE + image.rel_off`, applying each one.
///
/// Relocations are read directly out of the already-mapped guest image at
/// `BASE + rel_off`, not out of the scratch file mapping -- unlike
/// `DT_STRTAB`/`DT_SYMTAB`, which are read from the scratch image. See
/// DESIGN.md for why these two tables disagree on which address space
/// `d_ptr` lives in.
pub fn apply_relocations(
    image: &ParsedImage,
    symbols: &SymbolTable,
    start_entry: u64,
    size_bytes: u64,
) -> Result<(), LoaderError> {
    let count = size_bytes / RELA_SIZE;
    let base_ptr = (BASE + image.rel_off + start_entry * RELA_SIZE) as *const u8;
    let bytes = unsafe { std::slice::from_raw_parts(base_ptr, (count * RELA_SIZE) as usize) };
    let mut reader = Reader::from_bytes(bytes);

    for _ in 0..count {
        let rela = Rela::parse(&mut reader)?;
        apply_one(image, symbols, &rela)?;
    }

    Ok(())
}
