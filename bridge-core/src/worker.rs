use crate::engine::{Engine, EngineError};
use crate::input::Button;
use crate::palette::{Palette, PaletteKind};
use crate::protocol::{Command, CommandReceiver, Event, EventSender, GameInfo, decode_command};
use crate::video::render_frame;
use log::{debug, error, info, warn};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Running,
}

/// The worker side of the bridge. Owns the engine and everything derived from
/// it; the host only ever sees the events it emits.
///
/// Commands are handled strictly in arrival order on a single thread. A slow
/// command (a large memory dump, a ROM load) delays every command queued
/// behind it; there are no priority lanes.
pub struct WorkerEndpoint<E: Engine> {
    commands: CommandReceiver,
    events: EventSender,
    engine: Option<E>,
    palette: Palette,
    selection: PaletteKind,
    state: RunState,
    frame_interval: Option<Duration>,
    disconnected: bool,
}

impl<E: Engine> WorkerEndpoint<E> {
    pub fn new(commands: CommandReceiver, events: EventSender) -> Self {
        Self {
            commands,
            events,
            engine: None,
            palette: Palette::new(),
            selection: PaletteKind::Default,
            state: RunState::Paused,
            frame_interval: None,
            disconnected: false,
        }
    }

    /// Paces free-run to one frame per `interval`. Without it frames are
    /// produced as fast as the engine allows.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn selection(&self) -> PaletteKind {
        self.selection
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn handle(&mut self, command: Command) {
        if command.needs_engine() && self.engine.is_none() {
            error!("Received '{}' before a ROM was loaded", command.tag());
            self.emit(Event::log(format!(
                "ignored '{}': no ROM loaded, send a run command first",
                command.tag()
            )));
            return;
        }

        match command {
            Command::Run { rom } => self.load(rom),
            Command::Start => {
                info!("Starting free-run");
                self.state = RunState::Running;
            }
            Command::JoypadDown { button } => self.key_down(button),
            Command::JoypadUp { button } => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.key_up(button);
                }
            }
            Command::MemoryRequest { start, end } => self.request_memory(start, end),
            Command::SetPalette { name } => match name.parse::<PaletteKind>() {
                Ok(selection) => {
                    debug!("Palette set to {}", selection);
                    self.selection = selection;
                }
                Err(err) => {
                    warn!("{}", err);
                    self.emit(Event::log(err.to_string()));
                }
            },
            Command::SetCustomPalette { colors } => {
                debug!("Custom palette updated: {:?}", colors);
                self.palette.set_custom(colors);
            }
        }
    }

    /// Decodes and handles one JSON envelope. Unknown and malformed messages
    /// are dropped without an event.
    pub fn handle_envelope(&mut self, text: &str) {
        match decode_command(text) {
            Ok(Some(command)) => self.handle(command),
            Ok(None) => debug!("Ignoring envelope with unknown type"),
            Err(err) => warn!("Ignoring envelope: {}", err),
        }
    }

    /// Runs one frame when free-running. Returns whether a frame was emitted.
    pub fn tick(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }

        self.step_frame()
    }

    pub fn run(mut self) {
        info!("Worker started");
        let mut next_frame = Instant::now();

        while !self.disconnected {
            match self.state {
                RunState::Paused => match self.commands.recv() {
                    Ok(command) => {
                        self.handle(command);
                        next_frame = Instant::now();
                    }
                    Err(_) => break,
                },
                RunState::Running => {
                    // drain whatever arrived before the next frame is due
                    let received = match self.frame_interval {
                        Some(_) => self.commands.recv_deadline(next_frame).map_err(|e| e.is_disconnected()),
                        None => self.commands.try_recv().map_err(|e| e.is_disconnected()),
                    };

                    match received {
                        Ok(command) => self.handle(command),
                        Err(true) => break,
                        Err(false) => {
                            self.tick();
                            if let Some(interval) = self.frame_interval {
                                next_frame = (next_frame + interval).max(Instant::now());
                            }
                        }
                    }
                }
            }
        }

        info!("Worker stopped");
    }

    fn load(&mut self, rom: Vec<u8>) {
        let result = if rom.is_empty() {
            Err(EngineError::EmptyRom)
        } else {
            E::load(rom)
        };

        match result {
            Ok(engine) => {
                let info = GameInfo::from(engine.header());
                info!("Loaded '{}' ({})", info.title, info.cartridge_type);

                self.engine = Some(engine);
                self.state = RunState::Paused;
                self.emit(Event::GameInfo(info));
                self.emit(Event::PaletteSnapshot {
                    colors: self.palette.custom(),
                });
            }
            Err(err) => {
                error!("Failed to load ROM: {}", err);
                self.state = RunState::Paused;
                self.emit(Event::log(format!("failed to load ROM: {}", err)));
            }
        }
    }

    fn key_down(&mut self, button: Button) {
        let was_running = self.state == RunState::Running;
        match button {
            Button::Pause => self.state = RunState::Paused,
            Button::Resume => self.state = RunState::Running,
            Button::Step if was_running => self.state = RunState::Paused,
            Button::Step => {
                self.step_frame();
            }
            _ => {}
        }

        let snapshot = match self.engine.as_mut() {
            Some(engine) => engine.key_down(button),
            None => return,
        };
        if let Some(snapshot) = snapshot {
            debug!("Forwarding {} snapshot", snapshot.slot());
            self.emit(snapshot.into_event());
        }
    }

    fn request_memory(&mut self, start: u32, end: u32) {
        let result = match self.engine.as_mut() {
            Some(engine) => engine.request_memory(start, end),
            None => return,
        };

        match result {
            Ok(Some(snapshot)) => self.emit(snapshot.into_event()),
            Ok(None) => debug!("Memory request {:#06X}..{:#06X} produced no dump", start, end),
            Err(err) => {
                warn!("Memory request rejected: {}", err);
                self.emit(Event::log(err.to_string()));
            }
        }
    }

    fn step_frame(&mut self) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        if let Err(err) = engine.run_frame() {
            error!("{}", err);
            self.state = RunState::Paused;
            self.emit(Event::log(err.to_string()));
            return false;
        }

        let frame = render_frame(engine.framebuffer(), &self.palette, self.selection);
        #[cfg(feature = "verbose_debug")]
        log::trace!("Frame rendered with {} palette", self.selection);
        self.emit(Event::Frame(frame));
        true
    }

    fn emit(&mut self, event: Event) {
        if self.events.send(event).is_err() && !self.disconnected {
            warn!("Host hung up, stopping worker");
            self.disconnected = true;
        }
    }
}

/// Moves the worker onto its own thread.
pub fn spawn<E>(worker: WorkerEndpoint<E>) -> std::io::Result<JoinHandle<()>>
where
    E: Engine + Send + 'static,
{
    thread::Builder::new().name("emulator".to_string()).spawn(move || worker.run())
}
