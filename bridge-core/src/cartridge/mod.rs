pub mod header;

pub use header::{CartridgeHeader, HeaderError};

/// Builds a minimal 32 KiB ROM-only image with a valid header.
#[cfg(test)]
pub(crate) fn test_rom(title: &str) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x104..0x134].copy_from_slice(&header::NINTENDO_LOGO);
    for (dst, src) in rom[0x134..0x143].iter_mut().zip(title.bytes()) {
        *dst = src;
    }
    rom[0x14A] = 0x01; // non-japanese
    rom[0x14D] = header::header_checksum(&rom);
    rom
}
