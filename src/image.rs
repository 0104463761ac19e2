//! Parser and ParsedImage: opens an ELF file, validates its identity, and
//! materialises pointers into its program header table, dynamic section,
//! dynamic string/symbol tables and relocation table.
use std::fs::File;
use std::num::NonZeroUsize;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::sys::mman::{mmap, MapFlags, ProtFlags};
use tracing::{debug, trace};

use crate::{
    error::LoaderError,
    header::{ElfHeader, ProgramHeader},
    reader::Reader,
    segment::{DynamicEntry, DynamicTable, DynamicTag, SegmentType},
};

/// Owns the open file descriptor and scratch mapping for one ELF file, plus
/// cached pointers into its structures. Created by [`parse`], consumed
/// read-only by the mapper and relocator, and dropped (closing `fd` only --
/// never unmapping `image`) before control transfers to the guest.
#[derive(Debug)]
pub struct ParsedImage {
    fd: OwnedFd,
    pub size: usize,
    /// Base of the whole-file scratch mapping. `PROT_READ | PROT_WRITE |
    /// PROT_EXEC`, `MAP_PRIVATE`. Never unmapped: see `loader::manual_map`.
    pub image: *mut u8,
    pub ehdr: ElfHeader,
    pub phdrs: Vec<ProgramHeader>,
    pub dynamic: Vec<DynamicEntry>,
    /// `image + DT_STRTAB.d_ptr`.
    pub dyn_strtab: *const u8,
    /// `image + DT_SYMTAB.d_ptr`.
    pub dyn_symtab: *const u8,
    /// Raw `d_ptr` of whichever of `DT_REL`/`DT_RELA` was found. Interpreted
    /// as `BASE + rel_off` -- through the *loaded* image, not the scratch one.
    pub rel_off: u64,
    pub rel_is_rela: bool,
}

impl ParsedImage {
    /// Linear scan of the dynamic array for the first entry with a matching tag.
    pub fn find_dyn(&self, tag: DynamicTag) -> Option<&DynamicEntry> {
        self.dynamic.iter().find(|entry| entry.d_tag == tag)
    }

    /// Linear scan of the program header table for the first entry of a given type.
    pub fn find_phdr(&self, ty: SegmentType) -> Option<&ProgramHeader> {
        self.phdrs.iter().find(|phdr| phdr.p_type == ty)
    }

    pub fn fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

pub fn parse(path: &Path) -> Result<ParsedImage, LoaderError> {
    std::fs::metadata(path).map_err(|_| LoaderError::NotFound)?;

    let file = File::open(path)?;
    let size = file.metadata()?.len() as usize;
    if size == 0 {
        return Err(LoaderError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "empty file",
        )));
    }
    let fd: OwnedFd = file.into();

    let size_nz = NonZeroUsize::new(size).expect("checked non-zero above");
    // Scratch mapping of the whole file. Writable and executable so later
    // in-place pointer patching stays possible; never unmapped, because the
    // process is not expected to return once the guest takes over.
    let image = unsafe {
        mmap(
            None,
            size_nz,
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE | ProtFlags::PROT_EXEC,
            MapFlags::MAP_PRIVATE,
            &fd,
            0,
        )
    }?
    .as_ptr() as *mut u8;

    let bytes = unsafe { std::slice::from_raw_parts(image, size) };
    let mut reader = Reader::from_bytes(bytes);
    let ehdr = ElfHeader::parse(&mut reader)?;
    trace!(e_type = ?ehdr.e_type, e_machine = ?ehdr.e_machine, "parsed elf header");

    let phoff: u64 = ehdr.e_phoff.into();
    if phoff == 0 {
        return Err(LoaderError::NoPhdr);
    }
    reader.seek(phoff as usize).map_err(|_| LoaderError::NoPhdr)?;

    let mut phdrs = Vec::with_capacity(ehdr.e_phnum as usize);
    for _ in 0..ehdr.e_phnum {
        phdrs.push(ProgramHeader::parse(&mut reader)?);
    }

    let dynamic_phdr = phdrs
        .iter()
        .find(|phdr| phdr.p_type == SegmentType::PtDynamic)
        .ok_or(LoaderError::NoDynamic)?;

    let dyn_offset: usize = dynamic_phdr.p_offset.into();
    let dyn_size: usize = dynamic_phdr.p_memsz.into();
    let dynamic_bytes = bytes
        .get(dyn_offset..dyn_offset + dyn_size)
        .ok_or(LoaderError::NoDynamic)?;
    let dynamic = DynamicTable::parse(dynamic_bytes)?.entries().clone();

    // DT_STRTAB/DT_SYMTAB d_ptr is interpreted as a file-image offset here,
    // while DT_REL/DT_RELA below is interpreted through the loaded image
    // (BASE + d_ptr). This asymmetry mirrors the original loader exactly and
    // is almost certainly a bug in it -- see DESIGN.md.
    let strtab = dynamic
        .iter()
        .find(|entry| entry.d_tag == DynamicTag::StrTab);
    let symtab = dynamic
        .iter()
        .find(|entry| entry.d_tag == DynamicTag::SymTab);
    let (Some(strtab), Some(symtab)) = (strtab, symtab) else {
        return Err(LoaderError::NoStrtabSymtab);
    };
    let dyn_strtab = unsafe { image.add(strtab.d_ptr() as usize) } as *const u8;
    let dyn_symtab = unsafe { image.add(symtab.d_ptr() as usize) } as *const u8;

    let rel = dynamic.iter().find(|entry| entry.d_tag == DynamicTag::Rel);
    let rela = dynamic.iter().find(|entry| entry.d_tag == DynamicTag::RelA);
    let (rel_off, rel_is_rela) = match rel.or(rela) {
        Some(entry) if rel.is_some() => (entry.d_ptr(), false),
        Some(entry) => (entry.d_ptr(), true),
        None => return Err(LoaderError::NoRelocs),
    };

    debug!(
        phnum = ehdr.e_phnum,
        entry = format!("{:#x}", Into::<u64>::into(ehdr.e_entry)),
        "parsed elf image"
    );

    Ok(ParsedImage {
        fd,
        size,
        image,
        ehdr,
        phdrs,
        dynamic,
        dyn_strtab,
        dyn_symtab,
        rel_off,
        rel_is_rela,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_not_found() {
        let err = parse(Path::new("/nonexistent/path/for/eldr/tests")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let dir = std::env::temp_dir().join(format!("eldr-test-{}", std::process::id()));
        std::fs::write(&dir, [0u8; 64]).unwrap();
        let err = parse(&dir).unwrap_err();
        std::fs::remove_file(&dir).ok();
        assert!(matches!(err, LoaderError::BadMagic(_)));
    }
}
