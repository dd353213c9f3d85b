use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid button code {0}")]
    InvalidButtonCode(u8),
    #[error("Unknown button '{0}'")]
    UnknownButton(String),
    #[error("Malformed key binding '{0}', expected KEY=BUTTON")]
    MalformedBinding(String),
}

/// Joypad buttons plus the debugger controls that travel over the same input
/// path. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Button {
    Right = 0,
    Left = 1,
    Up = 2,
    Down = 3,
    A = 4,
    B = 5,
    Select = 6,
    Start = 7,
    Step = 8,
    Pause = 9,
    Resume = 10,
    DumpOam = 11,
    DumpVram = 12,
}

impl Button {
    pub const ALL: [Button; 13] = [
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Step,
        Button::Pause,
        Button::Resume,
        Button::DumpOam,
        Button::DumpVram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Button::Right => "right",
            Button::Left => "left",
            Button::Up => "up",
            Button::Down => "down",
            Button::A => "a",
            Button::B => "b",
            Button::Select => "select",
            Button::Start => "start",
            Button::Step => "step",
            Button::Pause => "pause",
            Button::Resume => "resume",
            Button::DumpOam => "oam",
            Button::DumpVram => "vram",
        }
    }

    /// True for the buttons that exist on the console itself.
    pub fn is_joypad(&self) -> bool {
        (*self as u8) <= Button::Start as u8
    }
}

impl From<Button> for u8 {
    fn from(button: Button) -> u8 {
        button as u8
    }
}

impl TryFrom<u8> for Button {
    type Error = InputError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Button::ALL
            .get(code as usize)
            .copied()
            .ok_or(InputError::InvalidButtonCode(code))
    }
}

impl FromStr for Button {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Button::ALL
            .into_iter()
            .find(|button| button.name() == lower)
            .ok_or_else(|| InputError::UnknownButton(s.to_string()))
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps physical key names to buttons. Key names follow the browser
/// convention (`"w"`, `"Enter"`, `" "`, `"Shift"`, ...).
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, Button>,
}

impl KeyMap {
    pub fn empty() -> Self {
        KeyMap {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: impl Into<String>, button: Button) {
        self.bindings.insert(key.into(), button);
    }

    pub fn lookup(&self, key: &str) -> Option<Button> {
        self.bindings.get(key).copied()
    }

    /// Parses a `KEY=BUTTON` override, e.g. `k=a`. The key may itself be
    /// `=` (`==start`), so the split happens on the last separator.
    pub fn parse_binding(binding: &str) -> Result<(String, Button), InputError> {
        let (key, button) = binding
            .rsplit_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| InputError::MalformedBinding(binding.to_string()))?;
        Ok((key.to_string(), button.parse()?))
    }

    pub fn apply_overrides<'a>(&mut self, overrides: impl IntoIterator<Item = &'a str>) -> Result<(), InputError> {
        for binding in overrides {
            let (key, button) = Self::parse_binding(binding)?;
            self.bind(key, button);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Button)> {
        self.bindings.iter().map(|(key, button)| (key.as_str(), *button))
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut map = KeyMap::empty();
        map.bind("w", Button::Up);
        map.bind("a", Button::Left);
        map.bind("s", Button::Down);
        map.bind("d", Button::Right);
        map.bind("Enter", Button::Select);
        map.bind(" ", Button::Start);
        map.bind("Shift", Button::A);
        map.bind("Control", Button::B);
        map.bind(",", Button::Step);
        map.bind(".", Button::Pause);
        map.bind("-", Button::Resume);
        map.bind("o", Button::DumpOam);
        map.bind("l", Button::DumpVram);
        map
    }
}
