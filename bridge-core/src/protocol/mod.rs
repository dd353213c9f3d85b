pub mod envelope;

use crate::cartridge::CartridgeHeader;
use crate::input::Button;
use crate::palette::{PALETTE_SIZE, Rgba};
use crate::video::RgbaFrame;
use serde::{Deserialize, Serialize};

pub use envelope::{WireError, decode_command, decode_event, encode_command, encode_event};

pub type CommandSender = crossbeam_channel::Sender<Command>;
pub type CommandReceiver = crossbeam_channel::Receiver<Command>;
pub type EventSender = crossbeam_channel::Sender<Event>;
pub type EventReceiver = crossbeam_channel::Receiver<Event>;

/// Host -> worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    #[serde(rename = "run")]
    Run { rom: Vec<u8> },
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "joyp_down")]
    JoypadDown { button: Button },
    #[serde(rename = "joyp_up")]
    JoypadUp { button: Button },
    #[serde(rename = "memRequest")]
    MemoryRequest { start: u32, end: u32 },
    #[serde(rename = "palette")]
    SetPalette { name: String },
    #[serde(rename = "set_custom_palette")]
    SetCustomPalette { colors: [Rgba; PALETTE_SIZE] },
}

impl Command {
    pub const TAGS: [&'static str; 7] = [
        "run",
        "start",
        "joyp_down",
        "joyp_up",
        "memRequest",
        "palette",
        "set_custom_palette",
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Command::Run { .. } => "run",
            Command::Start => "start",
            Command::JoypadDown { .. } => "joyp_down",
            Command::JoypadUp { .. } => "joyp_up",
            Command::MemoryRequest { .. } => "memRequest",
            Command::SetPalette { .. } => "palette",
            Command::SetCustomPalette { .. } => "set_custom_palette",
        }
    }

    /// Commands other than `Run` and the palette updates need a loaded engine.
    pub fn needs_engine(&self) -> bool {
        matches!(
            self,
            Command::Start | Command::JoypadDown { .. } | Command::JoypadUp { .. } | Command::MemoryRequest { .. }
        )
    }
}

/// Cartridge metadata as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub title: String,
    pub cartridge_type: String,
    pub sgb_flag: String,
    pub cgb_flag: String,
    pub rom_size: String,
    pub ram_size: String,
    pub non_japanese: bool,
}

impl From<&CartridgeHeader> for GameInfo {
    fn from(header: &CartridgeHeader) -> Self {
        GameInfo {
            title: header.title.clone(),
            cartridge_type: header.cartridge_type.to_string(),
            sgb_flag: header.sgb.to_string(),
            cgb_flag: header.cgb.to_string(),
            rom_size: header.rom_size.to_string(),
            ram_size: header.ram_size.to_string(),
            non_japanese: header.non_japanese,
        }
    }
}

/// Worker -> host.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    #[serde(rename = "console")]
    Log { text: String },
    #[serde(rename = "buffer")]
    Frame(RgbaFrame),
    #[serde(rename = "game")]
    GameInfo(GameInfo),
    #[serde(rename = "cpu")]
    CpuTrace { text: String },
    #[serde(rename = "mem")]
    MemoryDump { text: String },
    #[serde(rename = "oam")]
    OamDump { text: String },
    #[serde(rename = "vram")]
    VramDump { text: String },
    #[serde(rename = "custom_palette")]
    PaletteSnapshot { colors: [Rgba; PALETTE_SIZE] },
}

impl Event {
    pub const TAGS: [&'static str; 8] = ["console", "buffer", "game", "cpu", "mem", "oam", "vram", "custom_palette"];

    pub fn log(text: impl Into<String>) -> Event {
        Event::Log { text: text.into() }
    }
}
