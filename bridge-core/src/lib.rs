pub mod cartridge;
pub mod debug;
pub mod engine;
pub mod host;
pub mod input;
pub mod palette;
pub mod protocol;
pub mod store;
pub mod video;
pub mod worker;

mod tests;
