pub mod frame;

pub use frame::{RgbaFrame, render_frame};

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

pub const BYTES_PER_PIXEL: usize = 4;

/// One 2-bit shade per pixel, row-major, origin top-left.
pub const RAW_FRAME_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT;
pub const FRAME_BYTES: usize = RAW_FRAME_LEN * BYTES_PER_PIXEL;

pub type RawFrame = [u8; RAW_FRAME_LEN];
