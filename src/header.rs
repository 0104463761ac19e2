//! The Elf64 file header and program header table.
use crate::{
    addr::Addr,
    error::{ElfHeaderError, ProgramHeaderError},
    file_type::FileType,
    machine::Machine,
    reader::Reader,
    segment::{SegmentFlags, SegmentType},
};

const ELF_MAGIC_SIZE: usize = 4;
const ELF_MAGIC: &[u8] = &[0x7F, 0x45, 0x4C, 0x46];

#[derive(Debug)]
pub struct ElfHeader {
    pub e_type: FileType,
    pub e_machine: Machine,
    /// Memory address of the entry point from where the process starts executing
    pub e_entry: Addr,
    /// Points to the start of the program header table.
    pub e_phoff: Addr,
    /// Points to the start of the section header table.
    pub e_shoff: Addr,
    /// Contains the size of a program header table entry.
    pub e_phentsize: u16,
    /// Contains the number of entries in the program header table.
    pub e_phnum: u16,
}

impl ElfHeader {
    pub fn parse(reader: &mut Reader) -> Result<Self, ElfHeaderError> {
        let e_magic = reader.read_slice(ELF_MAGIC_SIZE)?;
        if e_magic != ELF_MAGIC {
            return Err(ElfHeaderError::BadMagic(format!("{:?}", e_magic)));
        }

        let e_class = reader.read_u8()?;
        if e_class != 2 {
            return Err(ElfHeaderError::Not64Bit);
        }

        let e_data = reader.read_u8()?;
        if e_data != 1 {
            return Err(ElfHeaderError::BadEndianness);
        }

        let e_version = reader.read_u8()?;
        if e_version != 1 {
            return Err(ElfHeaderError::BadVersion);
        }

        let e_osabi = reader.read_u8()?;
        if e_osabi != 0 && e_osabi != 3 {
            return Err(ElfHeaderError::BadOsAbi);
        }

        // e_abiversion + e_pad
        let _ = reader.read_slice(8)?;

        let e_type: FileType = reader.read_u16()?.try_into()?;
        let e_machine: Machine = reader.read_u16()?.try_into()?;

        let e_version = reader.read_u32()?;
        if e_version != 1 {
            return Err(ElfHeaderError::NotOriginalVersion);
        }

        let e_entry = Addr::parse(reader)?;
        let e_phoff = Addr::parse(reader)?;
        let e_shoff = Addr::parse(reader)?;

        // e_flags (4 bytes) + e_ehsize (2 bytes)
        let _ = reader.read_slice(6)?;

        let e_phentsize = reader.read_u16()?;
        let e_phnum = reader.read_u16()?;

        Ok(ElfHeader {
            e_type,
            e_machine,
            e_entry,
            e_phoff,
            e_shoff,
            e_phentsize,
            e_phnum,
        })
    }
}

/// A single `PT_*` entry from the program header table.
///
/// Unlike the library's general-purpose [`crate::segment`] parsing, this view
/// holds no copy of the segment's file contents: the loader maps segments
/// straight from the open file descriptor (see [`crate::mapper`]), so there is
/// nothing to eagerly read out of the scratch image.
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeader {
    pub p_type: SegmentType,
    pub p_flags: SegmentFlags,
    pub p_offset: Addr,
    pub p_vaddr: Addr,
    pub p_paddr: Addr,
    pub p_filesz: Addr,
    pub p_memsz: Addr,
    pub p_align: Addr,
}

impl ProgramHeader {
    pub fn parse(reader: &mut Reader) -> Result<Self, ProgramHeaderError> {
        let p_type = SegmentType::parse(reader)?;
        let p_flags = SegmentFlags::parse(reader)?;
        let p_offset = Addr::parse(reader)?;
        let p_vaddr = Addr::parse(reader)?;
        let p_paddr = Addr::parse(reader)?;
        let p_filesz = Addr::parse(reader)?;
        let p_memsz = Addr::parse(reader)?;
        let p_align = Addr::parse(reader)?;

        Ok(Self {
            p_type,
            p_flags,
            p_offset,
            p_vaddr,
            p_paddr,
            p_filesz,
            p_memsz,
            p_align,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; 64];
        bytes[0..4].copy_from_slice(ELF_MAGIC);
        bytes[4] = 2; // EI_CLASS = ELFCLASS64
        bytes[5] = 1; // EI_DATA = ELFDATA2LSB
        bytes[6] = 1; // EI_VERSION
        bytes[7] = 0; // EI_OSABI = SysV
        bytes[16..18].copy_from_slice(&2u16.to_le_bytes()); // e_type = ET_EXEC
        bytes[18..20].copy_from_slice(&0x3Eu16.to_le_bytes()); // e_machine = EM_X86_64
        bytes[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
        bytes[24..32].copy_from_slice(&0x401000u64.to_le_bytes()); // e_entry
        bytes[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        bytes[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
        bytes[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum
        bytes
    }

    #[test]
    fn parses_minimal_header() {
        let bytes = sample_header_bytes();
        let mut reader = Reader::from_bytes(&bytes);
        let ehdr = ElfHeader::parse(&mut reader).unwrap();
        assert_eq!(Into::<u64>::into(ehdr.e_entry), 0x401000);
        assert_eq!(Into::<u64>::into(ehdr.e_phoff), 64);
        assert_eq!(ehdr.e_phnum, 1);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_header_bytes();
        bytes[0] = 0;
        let mut reader = Reader::from_bytes(&bytes);
        assert!(matches!(
            ElfHeader::parse(&mut reader),
            Err(ElfHeaderError::BadMagic(_))
        ));
    }
}
