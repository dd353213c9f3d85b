use super::button::Button;
use bitflags::bitflags;

pub const JOYP_ADDRESS: u16 = 0xFF00;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyInput: u8 {
        const RIGHT     = 1 << 0;
        const LEFT      = 1 << 1;
        const UP        = 1 << 2;
        const DOWN      = 1 << 3;
        const A         = 1 << 4;
        const B         = 1 << 5;
        const SELECT    = 1 << 6;
        const START     = 1 << 7;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JoypSelect: u8 {
        const DIRECTIONS = 1 << 4;
        const ACTIONS    = 1 << 5;
    }
}

impl KeyInput {
    pub fn from_button(button: Button) -> Option<KeyInput> {
        match button {
            Button::Right => Some(KeyInput::RIGHT),
            Button::Left => Some(KeyInput::LEFT),
            Button::Up => Some(KeyInput::UP),
            Button::Down => Some(KeyInput::DOWN),
            Button::A => Some(KeyInput::A),
            Button::B => Some(KeyInput::B),
            Button::Select => Some(KeyInput::SELECT),
            Button::Start => Some(KeyInput::START),
            _ => None,
        }
    }
}

/// Input latch behind the JOYP register. Only console buttons are latched;
/// debugger controls are ignored here.
pub struct Joypad {
    held: KeyInput,
    select: JoypSelect,
}

impl Joypad {
    pub fn new() -> Joypad {
        Joypad {
            held: KeyInput::empty(),
            select: JoypSelect::all(),
        }
    }

    pub fn set_key_state(&mut self, button: Button, pressed: bool) {
        if let Some(key) = KeyInput::from_button(button) {
            self.held.set(key, pressed);
        }
    }

    pub fn is_key_pressed(&self, button: Button) -> bool {
        KeyInput::from_button(button).is_some_and(|key| self.held.contains(key))
    }

    pub fn held(&self) -> KeyInput {
        self.held
    }

    pub fn write(&mut self, value: u8) {
        self.select = JoypSelect::from_bits_truncate(value);
    }

    /// Selection lines and key lines are active low.
    pub fn read(&self) -> u8 {
        let mut pressed = 0u8;
        if !self.select.contains(JoypSelect::DIRECTIONS) {
            pressed |= self.held.bits() & 0x0F;
        }
        if !self.select.contains(JoypSelect::ACTIONS) {
            pressed |= self.held.bits() >> 4;
        }

        0xC0 | self.select.bits() | (!pressed & 0x0F)
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}
