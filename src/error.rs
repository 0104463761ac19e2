use core::ops::Range;
use thiserror::Error;

use crate::{file_type, machine, sym::SymbolError};

#[derive(Debug, Error)]
pub enum ElfHeaderError {
    #[error("Cannot find elf magic, found: {0}")]
    BadMagic(String),
    #[error("Elf is not 64-bit")]
    Not64Bit,
    #[error("Elf is not Littel Endian")]
    BadEndianness,
    #[error("Elf has bad version(not 1)")]
    BadVersion,
    #[error("Unknown OS ABI")]
    BadOsAbi,
    #[error("Unknown object file type {0}")]
    FileTypeError(#[from] file_type::Error),
    #[error("Unknown machine: {0}")]
    MachineError(#[from] machine::Error),
    #[error("Not original version")]
    NotOriginalVersion,
    #[error("Parsing error {0}")]
    ParseError(#[from] ParseError)
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Trying to parse more than the upper bound")]
    OutOfBounds,
    #[error("Trying to access bad range {0:?} from slice")]
    BadRange(Range<usize>),
}

#[derive(Debug, Error)]
pub enum ProgramHeaderError {
    #[error("Segment error {0}")]
    SegmentError(#[from] SegmentError),
    #[error("Parse error {0}")]
    ParseError(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Segment type unknown {0}")]
    TypeUnknown(u32),
    #[error("Segment parsing error {0}")]
    ParseError(#[from] ParseError),
}

/// Every way the loader pipeline can abort before transferring control to a
/// guest. Per policy (`LoaderError` is never shown to the user, only logged;
/// see `main.rs`) these map one-to-one onto the `main` exit path: any `Err`
/// here is swallowed and the process still exits `0`.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("path does not exist")]
    NotFound,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad elf magic")]
    BadMagic(#[from] ElfHeaderError),
    #[error("no program header table")]
    NoPhdr,
    #[error("no program header table: {0}")]
    NoPhdrParse(#[from] ProgramHeaderError),
    #[error("no PT_DYNAMIC segment")]
    NoDynamic,
    #[error("dynamic segment malformed: {0}")]
    BadDynamic(#[from] SegmentError),
    #[error("DT_STRTAB or DT_SYMTAB missing")]
    NoStrtabSymtab,
    #[error("no DT_REL/DT_RELA or DT_RELSZ/DT_RELASZ")]
    NoRelocs,
    #[error("failed to map PT_LOAD segment: {0}")]
    SegmentMapFailed(#[from] nix::Error),
    #[error("dynamic symbol malformed: {0}")]
    BadSymbol(#[from] SymbolError),
}
