pub mod button;
pub mod joypad;

pub use button::{Button, KeyMap};
