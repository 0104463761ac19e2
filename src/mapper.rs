//! Maps a single `PT_LOAD` program header from an open file descriptor into
//! the process's address space at the fixed bias `crate::BASE`.
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::os::fd::{BorrowedFd, RawFd};

use nix::sys::mman::{mmap, MapFlags, ProtFlags};
use tracing::{trace, warn};

use crate::{error::LoaderError, header::ProgramHeader, segment::SegmentFlags, BASE};

const PAGE_MASK: u64 = 0xFFF;

fn prot_flags(flags: SegmentFlags) -> ProtFlags {
    let mut prot = ProtFlags::empty();
    if flags.contains(SegmentFlags::READ) {
        prot |= ProtFlags::PROT_READ;
    }
    if flags.contains(SegmentFlags::WRITE) {
        prot |= ProtFlags::PROT_WRITE;
    }
    if flags.contains(SegmentFlags::EXEC) {
        prot |= ProtFlags::PROT_EXEC;
    }
    prot
}

/// Maps one `PT_LOAD` segment at `BASE + p_vaddr`, file-backed, `MAP_FIXED`.
///
/// The mapped length is `(p_filesz + va) & !PAGE_MASK` -- not a proper
/// page-aligned segment length, but what the original loader computes, and
/// preserved exactly. A segment whose `p_memsz` exceeds `p_filesz` (BSS) is
/// not zero-extended; see DESIGN.md.
pub fn map_segment(fd: RawFd, phdr: &ProgramHeader) -> Result<*mut c_void, LoaderError> {
    let va = BASE + Into::<u64>::into(phdr.p_vaddr);
    let addr = va & !PAGE_MASK;
    let len = (Into::<u64>::into(phdr.p_filesz) + va) & !PAGE_MASK;
    let file_offset = Into::<u64>::into(phdr.p_offset) as i64 - (va & PAGE_MASK) as i64;

    let len_nz = NonZeroUsize::new(len as usize)
        .unwrap_or_else(|| NonZeroUsize::new(1).expect("1 is non-zero"));
    let addr_nz = NonZeroUsize::new(addr as usize);
    let prot = prot_flags(phdr.p_flags);
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };

    let mapped = unsafe {
        mmap(
            addr_nz,
            len_nz,
            prot,
            MapFlags::MAP_PRIVATE | MapFlags::MAP_FIXED,
            borrowed,
            file_offset,
        )
    }?;

    trace!(
        addr = format!("{:#x}", addr),
        len,
        file_offset,
        ?prot,
        "mapped PT_LOAD segment"
    );

    if Into::<u64>::into(phdr.p_memsz) > Into::<u64>::into(phdr.p_filesz) {
        warn!(
            addr = format!("{:#x}", addr),
            "p_memsz exceeds p_filesz; BSS tail is not zero-filled"
        );
    }

    Ok(mapped.as_ptr())
}
