pub mod headless;

use crate::cartridge::{CartridgeHeader, HeaderError};
use crate::debug::DebugSnapshot;
use crate::input::Button;
use crate::video::RawFrame;
use thiserror::Error;

pub use headless::HeadlessEngine;

/// End of the 16-bit address space, exclusive.
pub const ADDRESS_SPACE_END: u32 = 0x1_0000;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ROM image is empty")]
    EmptyRom,
    #[error("Failed to parse cartridge header: {0}")]
    Header(#[from] HeaderError),
    #[error("Invalid memory range {start:#06X}..{end:#06X}")]
    InvalidRange { start: u32, end: u32 },
}

/// The console core as seen by the worker endpoint.
///
/// Debug output is returned by value from the call that produced it, so a
/// snapshot can only ever be forwarded once.
pub trait Engine: Sized {
    fn load(rom: Vec<u8>) -> Result<Self, EngineError>;

    fn header(&self) -> &CartridgeHeader;

    /// Runs until the next vblank.
    fn run_frame(&mut self) -> Result<(), EngineError>;

    fn framebuffer(&self) -> &RawFrame;

    fn key_down(&mut self, button: Button) -> Option<DebugSnapshot>;

    fn key_up(&mut self, button: Button);

    /// Snapshot of `[start, end)`. `Ok(None)` when there is nothing to dump.
    fn request_memory(&mut self, start: u32, end: u32) -> Result<Option<DebugSnapshot>, EngineError>;
}
