use super::{BYTES_PER_PIXEL, FRAME_BYTES, RawFrame, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::palette::{Palette, PaletteKind, Rgba};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("RGBA frame must be {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },
}

/// An owned RGBA image of the whole screen. Not `Clone`: frames move from the
/// worker to the host by value and every frame is a new allocation.
#[derive(PartialEq, Eq)]
pub struct RgbaFrame(Box<[u8; FRAME_BYTES]>);

impl RgbaFrame {
    fn blank() -> Self {
        RgbaFrame(Box::new([0; FRAME_BYTES]))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_BYTES {
            return Err(FrameError::WrongSize {
                expected: FRAME_BYTES,
                actual: bytes.len(),
            });
        }

        let mut frame = Self::blank();
        frame.0.copy_from_slice(bytes);
        Ok(frame)
    }

    pub fn from_pixels(rows: &[[Rgba; SCREEN_WIDTH]]) -> Result<Self, FrameError> {
        if rows.len() != SCREEN_HEIGHT {
            return Err(FrameError::WrongSize {
                expected: FRAME_BYTES,
                actual: rows.len() * SCREEN_WIDTH * BYTES_PER_PIXEL,
            });
        }

        let mut frame = Self::blank();
        for (dst, src) in frame.0.chunks_exact_mut(BYTES_PER_PIXEL).zip(rows.iter().flatten()) {
            dst.copy_from_slice(src);
        }
        Ok(frame)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        let offset = (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
        [self.0[offset], self.0[offset + 1], self.0[offset + 2], self.0[offset + 3]]
    }

    /// Row-major grid of RGBA quadruplets.
    pub fn pixels(&self) -> Vec<[Rgba; SCREEN_WIDTH]> {
        (0..SCREEN_HEIGHT)
            .map(|y| std::array::from_fn(|x| self.pixel(x, y)))
            .collect()
    }
}

impl fmt::Debug for RgbaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RgbaFrame({}x{})", SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl Serialize for RgbaFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> Deserialize<'de> for RgbaFrame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        RgbaFrame::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

/// Converts the engine's 2-bit scanout into a freshly allocated RGBA frame.
pub fn render_frame(raw: &RawFrame, palette: &Palette, kind: PaletteKind) -> RgbaFrame {
    let mut frame = RgbaFrame::blank();
    for (dst, &shade) in frame.0.chunks_exact_mut(BYTES_PER_PIXEL).zip(raw.iter()) {
        dst.copy_from_slice(&palette.resolve(shade, kind));
    }
    frame
}
