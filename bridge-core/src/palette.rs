use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type Rgba = [u8; 4];

pub const PALETTE_SIZE: usize = 4;

/// Greenish LCD shades of the DMG.
pub const DEFAULT_PALETTE: [Rgba; PALETTE_SIZE] = [
    [126, 132, 22, 255],
    [87, 123, 70, 255],
    [56, 93, 73, 255],
    [46, 70, 61, 255],
];

pub const BW_PALETTE: [Rgba; PALETTE_SIZE] = [
    [255, 255, 255, 255],
    [0xCC, 0xCC, 0xCC, 255],
    [0x77, 0x77, 0x77, 255],
    [0, 0, 0, 255],
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PaletteError {
    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaletteKind {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "bw")]
    BlackAndWhite,
    #[serde(rename = "custom")]
    Custom,
}

impl PaletteKind {
    pub const ALL: [PaletteKind; 3] = [PaletteKind::Default, PaletteKind::BlackAndWhite, PaletteKind::Custom];

    pub fn name(&self) -> &'static str {
        match self {
            PaletteKind::Default => "default",
            PaletteKind::BlackAndWhite => "bw",
            PaletteKind::Custom => "custom",
        }
    }
}

impl FromStr for PaletteKind {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(PaletteKind::Default),
            "bw" => Ok(PaletteKind::BlackAndWhite),
            "custom" => Ok(PaletteKind::Custom),
            other => Err(PaletteError::UnknownPalette(other.to_string())),
        }
    }
}

impl fmt::Display for PaletteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Color tables used to turn 2-bit shades into RGBA. The two built-in tables
/// are constants; only the custom table can change.
#[derive(Debug, Clone)]
pub struct Palette {
    custom: [Rgba; PALETTE_SIZE],
}

impl Palette {
    pub fn new() -> Self {
        Palette {
            custom: DEFAULT_PALETTE,
        }
    }

    pub fn custom(&self) -> [Rgba; PALETTE_SIZE] {
        self.custom
    }

    pub fn set_custom(&mut self, colors: [Rgba; PALETTE_SIZE]) {
        // alpha is not configurable
        self.custom = colors.map(|[r, g, b, _]| [r, g, b, 255]);
    }

    pub fn table(&self, kind: PaletteKind) -> &[Rgba; PALETTE_SIZE] {
        match kind {
            PaletteKind::Default => &DEFAULT_PALETTE,
            PaletteKind::BlackAndWhite => &BW_PALETTE,
            PaletteKind::Custom => &self.custom,
        }
    }

    /// Panics if `pixel` is not a 2-bit shade; the engine must never produce one.
    #[inline]
    pub fn resolve(&self, pixel: u8, kind: PaletteKind) -> Rgba {
        assert!(pixel < PALETTE_SIZE as u8, "pixel value {} out of range", pixel);
        self.table(kind)[pixel as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
