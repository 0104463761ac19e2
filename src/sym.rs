//! Module describing and parsing the dynamic symbol table of Elf files
use thiserror::Error;

use crate::{addr::Addr, reader::Reader};

/// Lower bound for OS specific use
const LOOS: u8 = 10;
/// Higher bound for OS specific use
const HIOS: u8 = 12;
/// Lower bound for processor specific use
const LOPROC: u8 = 13;
/// Higher bound for processor specific use
const HIPROC: u8 = 15;

/// The first symbol table entry is reserved and must be all zeroes.
/// The symbolic constant STN_UNDEF is used to refer to this entry.
#[derive(Debug, Clone, Copy)]
pub struct SymbolEntry {
    /// Offset, in bytes, to the symbol name, relative to the start of the dynamic
    /// string table. If this field contains zero, the symbol has no name.
    st_name: u32,
    /// Contains the symbol type and its binding attributes
    st_info: SymbolInfo,
    /// Reserved for future use; must be zero
    st_other: u8,
    /// Section table index of the section in which the symbol is defined.
    st_shndx: u16,
    /// Contains the value of the symbol. This may be an absolute value or a relocatable address.
    st_value: Addr,
    /// Size associated with the symbol, or zero if unknown.
    st_size: u64,
}

impl SymbolEntry {
    pub fn parse(reader: &mut Reader) -> Result<Self, SymbolError> {
        let st_name = reader.read_u32()?;
        let st_info = SymbolInfo::try_from(reader.read_u8()?)?;
        let st_other = reader.read_u8()?;
        let st_shndx = reader.read_u16()?;
        let st_value = Addr::from(reader.read_u64()?);
        let st_size = reader.read_u64()?;
        Ok(Self {
            st_name,
            st_info,
            st_other,
            st_shndx,
            st_value,
            st_size,
        })
    }

    /// Byte offset of this symbol's name within the dynamic string table.
    pub fn st_name(&self) -> u32 {
        self.st_name
    }
}

/// Information regarding a symbol table entry.
#[derive(Debug, Clone, Copy)]
pub struct SymbolInfo {
    /// Type attributes contained in the low-order four bits.
    #[allow(dead_code)]
    st_type: SymbolType,
    /// Binding attributes contained in the high-order four bits of the eight-bit byte
    #[allow(dead_code)]
    st_binding: SymbolBinding,
}

impl TryFrom<u8> for SymbolInfo {
    type Error = SymbolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let low_bits = value & 0xF;
        let high_bits = value >> 4;
        let st_type = SymbolType::try_from(low_bits)?;
        let st_binding = SymbolBinding::try_from(high_bits)?;
        Ok(Self { st_type, st_binding })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SymbolType {
    NoType,
    Object,
    Func,
    Section,
    File,
    OsSpecific(u8),
    ProcSpecific(u8),
}

#[derive(Debug, Clone, Copy)]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    OsSpecific(u8),
    ProcSpecific(u8),
}

impl TryFrom<u8> for SymbolType {
    type Error = SymbolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoType),
            1 => Ok(Self::Object),
            2 => Ok(Self::Func),
            3 => Ok(Self::Section),
            4 => Ok(Self::File),
            LOOS..=HIOS => Ok(Self::OsSpecific(value)),
            LOPROC..=HIPROC => Ok(Self::ProcSpecific(value)),
            _ => Err(SymbolError::UnknownSymbolType(value)),
        }
    }
}

impl TryFrom<u8> for SymbolBinding {
    type Error = SymbolError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Local),
            1 => Ok(Self::Global),
            2 => Ok(Self::Weak),
            LOOS..=HIOS => Ok(Self::OsSpecific(value)),
            LOPROC..=HIPROC => Ok(Self::ProcSpecific(value)),
            _ => Err(SymbolError::UnknownSymbolBinding(value)),
        }
    }
}

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("Symbol type referenced by value {0} is unknown")]
    UnknownSymbolType(u8),
    #[error("Symbol binding referenced by value {0} is unknown")]
    UnknownSymbolBinding(u8),
    #[error("Parsing error {0}")]
    ParseError(#[from] crate::error::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_undefined_symbol() {
        let mut bytes = vec![0u8; 24];
        bytes[0..4].copy_from_slice(&7u32.to_le_bytes());
        let mut reader = Reader::from_bytes(&bytes);
        let sym = SymbolEntry::parse(&mut reader).unwrap();
        assert_eq!(sym.st_name(), 7);
    }
}
