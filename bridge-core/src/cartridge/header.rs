use log::{debug, warn};
use phf::phf_map;
use std::fmt;
use thiserror::Error;

pub const KIB: usize = 1 << 10;
pub const MIB: usize = 1 << 20;

pub const LOGO_ADDRESS: usize = 0x104;
pub const TITLE_ADDRESS: usize = 0x134;
pub const CGB_FLAG_ADDRESS: usize = 0x143;
pub const SGB_FLAG_ADDRESS: usize = 0x146;
pub const CARTRIDGE_TYPE_ADDRESS: usize = 0x147;
pub const ROM_SIZE_ADDRESS: usize = 0x148;
pub const RAM_SIZE_ADDRESS: usize = 0x149;
pub const DESTINATION_ADDRESS: usize = 0x14A;
pub const HEADER_CHECKSUM_ADDRESS: usize = 0x14D;
pub const HEADER_END: usize = 0x150;

pub const NINTENDO_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D, 0x00, 0x08, 0x11,
    0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E,
    0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

static CARTRIDGE_TYPES: phf::Map<u8, &'static str> = phf_map! {
    0x00u8 => "ROM ONLY",
    0x01u8 => "MBC1",
    0x02u8 => "MBC1+RAM",
    0x03u8 => "MBC1+RAM+BATTERY",
    0x05u8 => "MBC2",
    0x06u8 => "MBC2+BATTERY",
    0x08u8 => "ROM+RAM",
    0x09u8 => "ROM+RAM+BATTERY",
    0x0Bu8 => "MMM01",
    0x0Cu8 => "MMM01+RAM",
    0x0Du8 => "MMM01+RAM+BATTERY",
    0x0Fu8 => "MBC3+TIMER+BATTERY",
    0x10u8 => "MBC3+TIMER+RAM+BATTERY",
    0x11u8 => "MBC3",
    0x12u8 => "MBC3+RAM",
    0x13u8 => "MBC3+RAM+BATTERY",
    0x19u8 => "MBC5",
    0x1Au8 => "MBC5+RAM",
    0x1Bu8 => "MBC5+RAM+BATTERY",
    0x1Cu8 => "MBC5+RUMBLE",
    0x1Du8 => "MBC5+RUMBLE+RAM",
    0x1Eu8 => "MBC5+RUMBLE+RAM+BATTERY",
    0x20u8 => "MBC6",
    0x22u8 => "MBC7+SENSOR+RUMBLE+RAM+BATTERY",
    0xFCu8 => "POCKET CAMERA",
    0xFDu8 => "BANDAI TAMA5",
    0xFEu8 => "HuC3",
    0xFFu8 => "HuC1+RAM+BATTERY",
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("ROM image is {0} bytes, too short to hold a cartridge header")]
    TooShort(usize),
    #[error("Unknown cartridge type {0:#04X}")]
    UnknownCartridgeType(u8),
    #[error("Invalid ROM size code {0:#04X}")]
    InvalidRomSize(u8),
    #[error("Invalid RAM size code {0:#04X}")]
    InvalidRamSize(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartridgeType(u8);

impl CartridgeType {
    pub fn code(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CartridgeType {
    type Error = HeaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if CARTRIDGE_TYPES.contains_key(&value) {
            Ok(CartridgeType(value))
        } else {
            Err(HeaderError::UnknownCartridgeType(value))
        }
    }
}

impl fmt::Display for CartridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", CARTRIDGE_TYPES.get(&self.0).copied().unwrap_or("UNKNOWN"))
    }
}

/// Size in bytes and number of banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomSize {
    pub bytes: usize,
    pub banks: usize,
}

impl TryFrom<u8> for RomSize {
    type Error = HeaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let (bytes, banks) = match value {
            // a plain 32 KiB cart has no banking
            0x00 => (32 * KIB, 1),
            0x01..=0x08 => ((32 * KIB) << value, 2 << value),
            0x52 => (1100 * KIB, 72),
            0x53 => (1200 * KIB, 80),
            0x54 => (1500 * KIB, 96),
            _ => return Err(HeaderError::InvalidRomSize(value)),
        };
        Ok(RomSize { bytes, banks })
    }
}

impl fmt::Display for RomSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.banks == 1 { "" } else { "s" };
        if self.bytes >= MIB {
            write!(f, "{} MiB in {} bank{}", self.bytes / MIB, self.banks, suffix)
        } else {
            write!(f, "{} KiB in {} bank{}", self.bytes / KIB, self.banks, suffix)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamSize {
    pub bytes: usize,
    pub banks: usize,
}

impl TryFrom<u8> for RamSize {
    type Error = HeaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let (bytes, banks) = match value {
            0x00 => (0, 0),
            0x01 => (2 * KIB, 1),
            0x02 => (8 * KIB, 1),
            0x03 => (32 * KIB, 4),
            0x04 => (128 * KIB, 16),
            0x05 => (64 * KIB, 8),
            _ => return Err(HeaderError::InvalidRamSize(value)),
        };
        Ok(RamSize { bytes, banks })
    }
}

impl fmt::Display for RamSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.banks == 1 { "" } else { "s" };
        write!(f, "{} KiB in {} bank{}", self.bytes / KIB, self.banks, suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgbFlag {
    DmgOnly,
    CgbSupport,
    CgbOnly,
}

impl From<u8> for CgbFlag {
    fn from(value: u8) -> Self {
        match value {
            0x80 => CgbFlag::CgbSupport,
            0xC0 => CgbFlag::CgbOnly,
            _ => CgbFlag::DmgOnly,
        }
    }
}

impl fmt::Display for CgbFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CgbFlag::DmgOnly => write!(f, "DMG supported"),
            CgbFlag::CgbSupport => write!(f, "CGB & DMG supported"),
            CgbFlag::CgbOnly => write!(f, "CGB supported"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgbFlag {
    NoSgb,
    SgbSupport,
}

impl From<u8> for SgbFlag {
    fn from(value: u8) -> Self {
        match value {
            0x03 => SgbFlag::SgbSupport,
            _ => SgbFlag::NoSgb,
        }
    }
}

impl fmt::Display for SgbFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SgbFlag::NoSgb => write!(f, "No SGB support"),
            SgbFlag::SgbSupport => write!(f, "SGB support"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub cartridge_type: CartridgeType,
    pub cgb: CgbFlag,
    pub sgb: SgbFlag,
    pub rom_size: RomSize,
    pub ram_size: RamSize,
    pub non_japanese: bool,
    pub logo: [u8; 48],
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<Self, HeaderError> {
        let title = Self::read_title(rom)?;

        let header = CartridgeHeader {
            title,
            cartridge_type: CartridgeType::try_from(rom[CARTRIDGE_TYPE_ADDRESS])?,
            cgb: rom[CGB_FLAG_ADDRESS].into(),
            sgb: rom[SGB_FLAG_ADDRESS].into(),
            rom_size: RomSize::try_from(rom[ROM_SIZE_ADDRESS])?,
            ram_size: RamSize::try_from(rom[RAM_SIZE_ADDRESS])?,
            non_japanese: rom[DESTINATION_ADDRESS] != 0,
            logo: rom[LOGO_ADDRESS..LOGO_ADDRESS + 48].try_into().unwrap_or([0; 48]),
        };

        if header.logo != NINTENDO_LOGO {
            warn!("Cartridge '{}' carries a non-standard boot logo", header.title);
        }
        let checksum = header_checksum(rom);
        if checksum != rom[HEADER_CHECKSUM_ADDRESS] {
            warn!(
                "Header checksum mismatch: computed {:02X}, stored {:02X}",
                checksum, rom[HEADER_CHECKSUM_ADDRESS]
            );
        }
        debug!("Parsed cartridge header: {}", header);

        Ok(header)
    }

    /// Just the cleaned title, without validating or logging anything else.
    pub fn read_title(rom: &[u8]) -> Result<String, HeaderError> {
        if rom.len() < HEADER_END {
            return Err(HeaderError::TooShort(rom.len()));
        }
        Ok(clean_title(&rom[TITLE_ADDRESS..TITLE_ADDRESS + 16]))
    }
}

impl fmt::Display for CartridgeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let destination = if self.non_japanese { "Non-Japanese" } else { "Japanese" };
        write!(
            f,
            "Title: {}, {}, {}, Cartridge type: {}, ROM size: {}, RAM size: {}, Destination: {}",
            self.title, self.cgb, self.sgb, self.cartridge_type, self.rom_size, self.ram_size, destination
        )
    }
}

/// The title field is padded with zeros and, on newer carts, shares bytes
/// with the manufacturer code. Everything from the first non-printable
/// character on is dropped.
fn clean_title(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| b as char)
        .take_while(|c| c.is_ascii_graphic() || *c == ' ')
        .collect()
}

pub fn header_checksum(rom: &[u8]) -> u8 {
    rom[TITLE_ADDRESS..HEADER_CHECKSUM_ADDRESS]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::test_rom;

    #[test]
    fn parse_minimal_rom() {
        let header = CartridgeHeader::parse(&test_rom("TETRIS")).unwrap();
        assert_eq!(header.title, "TETRIS");
        assert_eq!(header.cartridge_type.to_string(), "ROM ONLY");
        assert_eq!(header.cgb.to_string(), "DMG supported");
        assert_eq!(header.sgb.to_string(), "No SGB support");
        assert_eq!(header.rom_size.to_string(), "32 KiB in 1 bank");
        assert_eq!(header.ram_size.to_string(), "0 KiB in 0 banks");
        assert!(header.non_japanese);
        assert_eq!(header.logo, NINTENDO_LOGO);
    }

    #[test]
    fn parse_flags_and_sizes() {
        let mut rom = test_rom("POKEMON RED");
        rom[CARTRIDGE_TYPE_ADDRESS] = 0x13;
        rom[ROM_SIZE_ADDRESS] = 0x05;
        rom[RAM_SIZE_ADDRESS] = 0x03;
        rom[SGB_FLAG_ADDRESS] = 0x03;
        rom[CGB_FLAG_ADDRESS] = 0xC0;
        rom[DESTINATION_ADDRESS] = 0x00;

        let header = CartridgeHeader::parse(&rom).unwrap();
        assert_eq!(header.title, "POKEMON RED");
        assert_eq!(header.cartridge_type.to_string(), "MBC3+RAM+BATTERY");
        assert_eq!(header.rom_size.to_string(), "1 MiB in 64 banks");
        assert_eq!(header.ram_size.to_string(), "32 KiB in 4 banks");
        assert_eq!(header.sgb, SgbFlag::SgbSupport);
        assert_eq!(header.cgb, CgbFlag::CgbOnly);
        assert!(!header.non_japanese);
    }

    #[test]
    fn title_stops_at_first_unprintable_byte() {
        let mut rom = test_rom("ZELDA");
        rom[TITLE_ADDRESS + 6] = b'X';
        assert_eq!(CartridgeHeader::parse(&rom).unwrap().title, "ZELDA");
    }

    #[test]
    fn read_title_skips_validation() {
        let mut rom = test_rom("TETRIS");
        rom[CARTRIDGE_TYPE_ADDRESS] = 0x04;
        rom[LOGO_ADDRESS] = 0;
        assert_eq!(CartridgeHeader::read_title(&rom).unwrap(), "TETRIS");
        assert_eq!(CartridgeHeader::read_title(&[0; 0x10]), Err(HeaderError::TooShort(0x10)));
    }

    #[test]
    fn rejects_bad_headers() {
        assert_eq!(CartridgeHeader::parse(&[0; 0x100]), Err(HeaderError::TooShort(0x100)));

        let mut rom = test_rom("BAD");
        rom[CARTRIDGE_TYPE_ADDRESS] = 0x04;
        assert_eq!(CartridgeHeader::parse(&rom), Err(HeaderError::UnknownCartridgeType(0x04)));

        let mut rom = test_rom("BAD");
        rom[ROM_SIZE_ADDRESS] = 0x09;
        assert_eq!(CartridgeHeader::parse(&rom), Err(HeaderError::InvalidRomSize(0x09)));

        let mut rom = test_rom("BAD");
        rom[RAM_SIZE_ADDRESS] = 0x06;
        assert_eq!(CartridgeHeader::parse(&rom), Err(HeaderError::InvalidRamSize(0x06)));
    }

    #[test]
    fn checksum_matches_builder() {
        let rom = test_rom("TETRIS");
        assert_eq!(header_checksum(&rom), rom[HEADER_CHECKSUM_ADDRESS]);
    }
}
