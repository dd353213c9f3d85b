use crate::cartridge::CartridgeHeader;
use crate::input::{Button, KeyMap};
use crate::palette::{DEFAULT_PALETTE, PALETTE_SIZE, PaletteKind, Rgba};
use crate::protocol::{Command, CommandSender, Event, EventReceiver, GameInfo};
use crate::store::{RomStore, StoreError};
use crate::video::RgbaFrame;
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, error, info, trace, warn};
use thiserror::Error;

const LOG_CAPACITY: usize = 256;

/// Whatever presents frames to the user.
pub trait RenderTarget {
    fn draw(&mut self, frame: RgbaFrame);
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Emulation worker is gone")]
    Disconnected,
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
    #[error("Invalid colour '{0}', expected #RRGGBB")]
    InvalidColor(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Idle,
    Loaded,
    Running,
}

/// Everything the UI shows besides the screen.
#[derive(Debug, Clone)]
pub struct HostView {
    pub log: Vec<String>,
    pub game: Option<GameInfo>,
    pub cpu_trace: String,
    pub memory_dump: String,
    pub oam_dump: String,
    pub vram_dump: String,
    pub custom_palette: [Rgba; PALETTE_SIZE],
    pub palette: PaletteKind,
    pub library: Vec<String>,
}

impl Default for HostView {
    // the worker's custom table starts out as the default shades
    fn default() -> Self {
        HostView {
            log: Vec::new(),
            game: None,
            cpu_trace: String::new(),
            memory_dump: String::new(),
            oam_dump: String::new(),
            vram_dump: String::new(),
            custom_palette: DEFAULT_PALETTE,
            palette: PaletteKind::default(),
            library: Vec::new(),
        }
    }
}

impl HostView {
    fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }
}

/// The UI side of the bridge: turns user actions into commands and applies
/// the worker's events to the view, the render target and the ROM library.
pub struct SessionHost<R: RenderTarget> {
    commands: CommandSender,
    events: EventReceiver,
    target: R,
    store: RomStore,
    store_ready: Option<Receiver<Result<(), StoreError>>>,
    pending_put: Option<(String, Vec<u8>)>,
    keymap: KeyMap,
    view: HostView,
    state: HostState,
    rom: Option<Vec<u8>>,
    worker_alive: bool,
}

impl<R: RenderTarget> SessionHost<R> {
    /// Starts opening `store` in the background; `pump` picks up the result.
    pub fn new(commands: CommandSender, events: EventReceiver, target: R, store: RomStore) -> Self {
        let store_ready = Some(store.open_in_background());
        Self {
            commands,
            events,
            target,
            store,
            store_ready,
            pending_put: None,
            keymap: KeyMap::default(),
            view: HostView::default(),
            state: HostState::Idle,
            rom: None,
            worker_alive: true,
        }
    }

    pub fn with_keymap(mut self, keymap: KeyMap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn view(&self) -> &HostView {
        &self.view
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    pub fn store(&self) -> &RomStore {
        &self.store
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn current_rom(&self) -> Option<&[u8]> {
        self.rom.as_deref()
    }

    pub fn is_worker_alive(&self) -> bool {
        self.worker_alive
    }

    fn send(&mut self, command: Command) -> Result<(), HostError> {
        trace!("-> {}", command.tag());
        self.commands.send(command).map_err(|_| {
            if self.worker_alive {
                error!("Emulation worker hung up");
                self.worker_alive = false;
            }
            HostError::Disconnected
        })
    }

    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), HostError> {
        info!("Loading ROM ({} bytes)", rom.len());
        self.rom = Some(rom.clone());
        self.send(Command::Run { rom })
    }

    pub fn load_from_library(&mut self, title: &str) -> Result<(), HostError> {
        let rom = match self.store.get(title) {
            Ok(rom) => rom,
            Err(err) => {
                warn!("Cannot load '{}' from the library: {}", title, err);
                self.view.push_log(err.to_string());
                return Err(err.into());
            }
        };
        self.load_rom(rom)
    }

    pub fn start(&mut self) -> Result<(), HostError> {
        self.send(Command::Start)?;
        if self.state == HostState::Loaded {
            self.state = HostState::Running;
        }
        Ok(())
    }

    /// Returns whether `key` is bound; unbound keys are ignored.
    pub fn key_down(&mut self, key: &str) -> Result<bool, HostError> {
        let Some(button) = self.keymap.lookup(key) else {
            trace!("Unbound key '{}'", key);
            return Ok(false);
        };
        self.send(Command::JoypadDown { button })?;
        Ok(true)
    }

    pub fn key_up(&mut self, key: &str) -> Result<bool, HostError> {
        let Some(button) = self.keymap.lookup(key) else {
            return Ok(false);
        };
        self.send(Command::JoypadUp { button })?;
        Ok(true)
    }

    /// Taps a button: down immediately followed by up.
    pub fn press(&mut self, button: Button) -> Result<(), HostError> {
        self.send(Command::JoypadDown { button })?;
        self.send(Command::JoypadUp { button })
    }

    /// Adds a line to the diagnostic log shown to the user.
    pub fn report(&mut self, line: impl Into<String>) {
        self.view.push_log(line);
    }

    pub fn select_palette(&mut self, kind: PaletteKind) -> Result<(), HostError> {
        self.view.palette = kind;
        self.send(Command::SetPalette {
            name: kind.name().to_string(),
        })
    }

    pub fn set_custom_palette(&mut self, colors: [Rgba; PALETTE_SIZE]) -> Result<(), HostError> {
        self.view.custom_palette = colors.map(|[r, g, b, _]| [r, g, b, 0xFF]);
        self.send(Command::SetCustomPalette { colors })
    }

    /// Both bounds are hex, `0x` optional. Bad input lands in the log.
    pub fn request_memory(&mut self, start: &str, end: &str) -> Result<(), HostError> {
        let range = parse_address(start).and_then(|start| Ok((start, parse_address(end)?)));
        match range {
            Ok((start, end)) => self.send(Command::MemoryRequest { start, end }),
            Err(err) => {
                self.view.push_log(err.to_string());
                Err(err)
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Log { text } => {
                info!("worker: {}", text);
                self.view.push_log(text);
            }
            Event::Frame(frame) => self.target.draw(frame),
            Event::GameInfo(info) => {
                info!("Running '{}'", info.title);
                let title = info.title.clone();
                self.view.game = Some(info);
                self.state = HostState::Loaded;
                self.persist(&title);
                self.refresh_library();
            }
            Event::CpuTrace { text } => self.view.cpu_trace = text,
            Event::MemoryDump { text } => self.view.memory_dump = text,
            Event::OamDump { text } => self.view.oam_dump = text,
            Event::VramDump { text } => self.view.vram_dump = text,
            Event::PaletteSnapshot { colors } => self.view.custom_palette = colors,
        }
    }

    /// Resolves a pending store open, then applies every queued event.
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        self.poll_store();

        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.worker_alive {
                        error!("Emulation worker stopped");
                        self.worker_alive = false;
                    }
                    break;
                }
            }
        }
        handled
    }

    fn poll_store(&mut self) {
        let Some(ready) = self.store_ready.as_ref() else {
            return;
        };
        let result = match ready.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(StoreError::Unavailable("store open was abandoned".to_string())),
        };
        self.store_ready = None;

        match result {
            Ok(()) => {
                debug!("ROM library ready");
                if let Some((title, rom)) = self.pending_put.take() {
                    self.put(&title, &rom);
                }
                self.refresh_library();
            }
            Err(err) => {
                warn!("Auto-store disabled: {}", err);
                self.view.push_log(format!("auto-store disabled: {}", err));
                if let Some((title, _)) = self.pending_put.take() {
                    self.view.push_log(format!("'{}' was not stored", title));
                }
            }
        }
    }

    fn persist(&mut self, title: &str) {
        if title.is_empty() {
            debug!("Not storing an untitled ROM");
            return;
        }
        let Some(rom) = self.rom.as_ref() else {
            return;
        };

        // a stale GameInfo may arrive after the next image was already sent
        match CartridgeHeader::read_title(rom) {
            Ok(current) if current == title => {}
            _ => {
                debug!("Current image is not '{}', not storing it", title);
                return;
            }
        }

        if self.store_ready.is_some() {
            debug!("ROM library still opening, queueing '{}'", title);
            self.pending_put = Some((title.to_string(), rom.clone()));
            return;
        }

        let rom = rom.clone();
        self.put(title, &rom);
    }

    fn put(&mut self, title: &str, rom: &[u8]) {
        if let Err(err) = self.store.put(title, rom) {
            warn!("Could not store '{}': {}", title, err);
            self.view.push_log(format!("could not store '{}': {}", title, err));
        }
    }

    pub fn refresh_library(&mut self) {
        match self.store.list_titles() {
            Ok(titles) => self.view.library = titles,
            Err(StoreError::InitPending) => {}
            Err(err) => debug!("Library unavailable: {}", err),
        }
    }
}

/// Parses a hex address; the `0x` prefix is optional.
pub fn parse_address(text: &str) -> Result<u32, HostError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HostError::InvalidAddress(text.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| HostError::InvalidAddress(text.to_string()))
}

pub fn parse_hex_color(text: &str) -> Result<Rgba, HostError> {
    let invalid = || HostError::InvalidColor(text.to_string());
    let digits = text.trim().strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?, 0xFF])
}

pub fn format_hex_color(color: Rgba) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}
