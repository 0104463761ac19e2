use crate::{
    addr::Addr,
    reader::Reader,
    error::SegmentError,
};

/// Structure of a relocation entry. Rela entries contain an explicit addend.
/// 64-bit x86 use only Rela relocation entries.
#[derive(Debug)]
pub struct Rela {
    /// Gives the location at which to apply the relocation action.
    /// For an executable or shared object, the value indicates the virtual address
    /// of the storage unit affected by the relocation. This information makes the
    /// relocation entries more useful for the runtime linker.
    pub r_offset: Addr,
    /// The type of relocation to apply
    pub r_type: RelType,
    /// Symbol table index, with respect to which the relocation must be made
    pub r_sym: u32,
    /// This member specifies a contant addend used to compute the value to be stored
    /// into th relocatable field.
    pub r_addend: u64,
}

impl Rela {
    /// Reads one `Elf64_Rela` entry. `r_info` is decoded as two little-endian
    /// `u32` halves rather than one `u64` shift-and-mask: the low half (read
    /// first) is the relocation type, the high half is the symbol index.
    pub fn parse(reader: &mut Reader) -> Result<Self, SegmentError> {
        let r_offset = Addr::from(reader.read_u64()?);
        let r_type = RelType::from(reader.read_u32()?);
        let r_sym = reader.read_u32()?;
        let r_addend = reader.read_u64()?;

        Ok(Self {
            r_offset,
            r_type,
            r_sym,
            r_addend
        })
    }
}

/// Relocation type, decoded from the low 32 bits of `r_info`. Types this
/// loader does not act on are kept as `Other` and ignored by the relocator,
/// rather than rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelType {
    None,
    W64,
    Pc32,
    Got32,
    Plt32,
    Copy,
    GlobDat,
    JumpSlot,
    Relative,
    Other(u32),
}

impl From<u32> for RelType {
    fn from(value: u32) -> RelType {
        match value {
            0 => Self::None,
            1 => Self::W64,
            2 => Self::Pc32,
            3 => Self::Got32,
            4 => Self::Plt32,
            5 => Self::Copy,
            6 => Self::GlobDat,
            7 => Self::JumpSlot,
            8 => Self::Relative,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_relative_and_unknown_types() {
        assert_eq!(RelType::from(8), RelType::Relative);
        assert_eq!(RelType::from(42), RelType::Other(42));
    }

    #[test]
    fn parses_rela_entry_with_split_r_info() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x2000u64.to_le_bytes()); // r_offset
        bytes.extend_from_slice(&8u32.to_le_bytes()); // r_type = RELATIVE
        bytes.extend_from_slice(&3u32.to_le_bytes()); // r_sym
        bytes.extend_from_slice(&0x10u64.to_le_bytes()); // r_addend
        let mut reader = Reader::from_bytes(&bytes);
        let rela = Rela::parse(&mut reader).unwrap();
        assert_eq!(rela.r_type, RelType::Relative);
        assert_eq!(rela.r_sym, 3);
        assert_eq!(rela.r_addend, 0x10);
    }
}