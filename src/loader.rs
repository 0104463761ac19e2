//! Orchestrates a single manual load: parse, map every `PT_LOAD` segment,
//! apply relocations, and jump to the guest entry point. Never expected to
//! return -- the guest either calls `exit` through the shim or the process
//! is torn down by the kernel.
use std::path::Path;

use tracing::{debug, error, trace};

use crate::{
    error::LoaderError,
    image, mapper,
    relocator::apply_relocations,
    segment::{DynamicTag, SegmentType},
    shim::libc_start_main_shim,
    symbols::SymbolTable,
    BASE,
};

/// The guest's real entry point (`_start`), not its `main`. Takes no
/// arguments: `_start` reads argc/argv off the stack itself, the same way
/// the host kernel would have set it up after `execve`. The guest's `main`
/// is instead invoked from [`crate::shim::libc_start_main_shim`], with the
/// argv relayed through [`crate::argv`].
type GuestStart = extern "C" fn();

/// Parses `path`, maps its `PT_LOAD` segments, relocates it, and transfers
/// control to its entry point. On success this function does not return.
pub fn manual_map(path: &Path) -> Result<(), LoaderError> {
    let image = image::parse(path)?;

    for phdr in image
        .phdrs
        .iter()
        .filter(|phdr| phdr.p_type == SegmentType::PtLoad)
    {
        mapper::map_segment(image.fd(), phdr)?;
    }

    let symbols = SymbolTable::new(libc_start_main_shim as *mut std::ffi::c_void);

    // DT_PLTRELSZ is looked up but, matching the original loader exactly,
    // never used below: both relocation passes are sized from
    // DT_RELSZ/DT_RELASZ instead. Preserved as a faithful reproduction of
    // that bug; see DESIGN.md.
    let _pltrelsz = image.find_dyn(DynamicTag::PltRelSz);

    let relsz = image
        .find_dyn(DynamicTag::RelSz)
        .or_else(|| image.find_dyn(DynamicTag::RelASz))
        .ok_or(LoaderError::NoRelocs)?
        .d_val();

    apply_relocations(&image, &symbols, 0, relsz)?;
    let rela_count = relsz / 24;
    apply_relocations(&image, &symbols, rela_count, relsz)?;

    let entry = BASE + Into::<u64>::into(image.ehdr.e_entry);
    debug!(entry = format!("{:#x}", entry), "jumping to guest entry point");

    // Dropping here closes the scratch file descriptor but intentionally
    // leaves the scratch mmap and every PT_LOAD mapping alive: the process
    // is not expected to return past the guest's entry point.
    drop(image);

    let entry_fn: GuestStart = unsafe { std::mem::transmute(entry as *const ()) };
    trace!("transferring control to guest");
    entry_fn();
    error!("guest entry point returned; this should not happen");
    std::process::exit(1);
}
