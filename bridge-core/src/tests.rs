#[cfg(test)]
mod tests {
    use crate::cartridge::{CartridgeHeader, test_rom};
    use crate::engine::HeadlessEngine;
    use crate::host::{HostState, RenderTarget, SessionHost};
    use crate::input::Button;
    use crate::palette::{DEFAULT_PALETTE, PaletteKind};
    use crate::protocol::{Command, Event, EventReceiver, GameInfo, encode_command};
    use crate::store::RomStore;
    use crate::video::{FRAME_BYTES, RgbaFrame};
    use crate::worker::{self, RunState, WorkerEndpoint};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    const CUSTOM: [[u8; 4]; 4] = [[10, 20, 30, 255], [40, 50, 60, 255], [70, 80, 90, 255], [100, 110, 120, 255]];

    fn worker() -> (WorkerEndpoint<HeadlessEngine>, crate::protocol::CommandSender, EventReceiver) {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        (WorkerEndpoint::new(command_rx, event_tx), command_tx, event_rx)
    }

    fn drain(events: &EventReceiver) -> Vec<Event> {
        events.try_iter().collect()
    }

    fn temp_store(name: &str) -> RomStore {
        let path = std::env::temp_dir().join(format!("gbbridge-e2e-{}-{}.zip", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        RomStore::new(path)
    }

    #[test]
    fn run_start_and_two_frames() {
        let (mut worker, _commands, events) = worker();

        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        worker.handle(Command::Start);
        assert!(worker.tick());
        assert!(worker.tick());

        let events = drain(&events);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Event::GameInfo(info) if info.title == "TETRIS"));
        assert_eq!(events[1], Event::PaletteSnapshot { colors: DEFAULT_PALETTE });
        for event in &events[2..] {
            let Event::Frame(frame) = event else {
                panic!("expected a frame, got {:?}", event);
            };
            assert_eq!(frame.as_bytes().len(), FRAME_BYTES);
            assert_eq!(frame.as_bytes().len(), 92_160);
        }
    }

    #[test]
    fn commands_before_run_are_reported() {
        let (mut worker, _commands, events) = worker();

        worker.handle(Command::JoypadDown { button: Button::A });
        worker.handle(Command::MemoryRequest { start: 0, end: 0x10 });
        worker.handle(Command::Start);
        assert!(!worker.tick());

        let logged = drain(&events);
        assert_eq!(logged.len(), 3);
        assert!(logged.iter().all(|event| matches!(event, Event::Log { text } if text.contains("no ROM loaded"))));
        assert_eq!(worker.state(), RunState::Paused);

        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        assert!(matches!(drain(&events).first(), Some(Event::GameInfo(_))));
    }

    #[test]
    fn unknown_envelopes_produce_nothing() {
        let (mut worker, _commands, events) = worker();

        worker.handle_envelope(r#"{"type":"bogus"}"#);
        worker.handle_envelope("{ not json");
        worker.handle_envelope(r#"{"type":"joyp_down","payload":{"button":42}}"#);
        assert!(drain(&events).is_empty());

        let run = encode_command(&Command::Run { rom: test_rom("ZELDA") }).unwrap();
        worker.handle_envelope(&run);
        assert!(matches!(drain(&events).first(), Some(Event::GameInfo(info)) if info.title == "ZELDA"));
    }

    #[test]
    fn memory_request_envelope_produces_a_dump() {
        let (mut worker, _commands, events) = worker();
        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        drain(&events);

        worker.handle_envelope(r#"{"type":"memRequest","payload":{"start":260,"end":264}}"#);
        let events = drain(&events);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::MemoryDump { text } if !text.is_empty()));
    }

    #[test]
    fn custom_palette_reaches_frames() {
        let (mut worker, _commands, events) = worker();

        worker.handle(Command::SetCustomPalette { colors: CUSTOM });
        assert_eq!(worker.palette().resolve(2, PaletteKind::Custom), [70, 80, 90, 255]);

        worker.handle(Command::SetPalette {
            name: "custom".to_string(),
        });
        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        worker.handle(Command::Start);
        worker.tick();

        let events = drain(&events);
        assert_eq!(events[1], Event::PaletteSnapshot { colors: CUSTOM });
        let Some(Event::Frame(frame)) = events.last() else {
            panic!("expected a frame");
        };
        assert_eq!(frame.pixel(0, 0), CUSTOM[0]);
        assert!(frame.pixels().iter().flatten().any(|&px| px == CUSTOM[3]));
    }

    #[test]
    fn unknown_palette_is_logged() {
        let (mut worker, _commands, events) = worker();
        worker.handle(Command::SetPalette {
            name: "sepia".to_string(),
        });

        assert!(matches!(&drain(&events)[..], [Event::Log { text }] if text.contains("sepia")));
        assert_eq!(worker.selection(), PaletteKind::Default);
    }

    #[test]
    fn pause_step_resume() {
        let (mut worker, _commands, events) = worker();
        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        worker.handle(Command::Start);
        drain(&events);

        worker.handle(Command::JoypadDown { button: Button::Pause });
        assert_eq!(worker.state(), RunState::Paused);
        assert!(!worker.tick());
        assert!(drain(&events).is_empty());

        // stepping while paused advances exactly one frame
        worker.handle(Command::JoypadDown { button: Button::Step });
        let stepped = drain(&events);
        assert_eq!(stepped.len(), 2);
        assert!(matches!(stepped[0], Event::Frame(_)));
        assert!(matches!(&stepped[1], Event::CpuTrace { text } if text.starts_with("frame: 1")));
        assert_eq!(worker.engine().map(HeadlessEngine::frame_count), Some(1));

        worker.handle(Command::JoypadDown { button: Button::Resume });
        assert_eq!(worker.state(), RunState::Running);
        assert!(worker.tick());

        // stepping while running pauses before the next frame
        worker.handle(Command::JoypadDown { button: Button::Step });
        assert_eq!(worker.state(), RunState::Paused);
        assert!(!worker.tick());
        assert_eq!(worker.engine().map(HeadlessEngine::frame_count), Some(2));
    }

    #[test]
    fn engine_errors_keep_the_worker_usable() {
        let (mut worker, _commands, events) = worker();
        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        drain(&events);

        worker.handle(Command::MemoryRequest { start: 0x200, end: 0x100 });
        worker.handle(Command::Run { rom: Vec::new() });
        worker.handle(Command::Run { rom: vec![0; 0x40] });
        let logged = drain(&events);
        assert_eq!(logged.len(), 3);
        assert!(logged.iter().all(|event| matches!(event, Event::Log { .. })));

        // the previous cartridge is still in place
        assert_eq!(worker.engine().map(|e| e.frame_count()), Some(0));
        worker.handle(Command::MemoryRequest { start: 0x134, end: 0x13A });
        assert!(matches!(&drain(&events)[..], [Event::MemoryDump { text }] if text == "0134: 54 45 54 52 49 53\n"));
    }

    #[test]
    fn debug_dumps_are_emitted_once() {
        let (mut worker, _commands, events) = worker();
        worker.handle(Command::Run { rom: test_rom("TETRIS") });
        drain(&events);

        worker.handle(Command::JoypadDown { button: Button::DumpOam });
        worker.handle(Command::JoypadUp { button: Button::DumpOam });
        worker.handle(Command::JoypadDown { button: Button::A });
        worker.handle(Command::JoypadDown { button: Button::DumpVram });

        let events = drain(&events);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::OamDump { .. }));
        assert!(matches!(events[1], Event::VramDump { .. }));
    }

    #[test]
    fn threaded_worker_stops_when_host_leaves() {
        let (worker, commands, events) = worker();
        let handle = worker::spawn(worker.with_frame_interval(Duration::from_millis(1))).unwrap();

        commands.send(Command::Run { rom: test_rom("TETRIS") }).unwrap();
        commands.send(Command::Start).unwrap();

        let timeout = Duration::from_secs(5);
        assert!(matches!(events.recv_timeout(timeout).unwrap(), Event::GameInfo(_)));
        assert!(matches!(events.recv_timeout(timeout).unwrap(), Event::PaletteSnapshot { .. }));
        assert!(matches!(events.recv_timeout(timeout).unwrap(), Event::Frame(_)));
        assert!(matches!(events.recv_timeout(timeout).unwrap(), Event::Frame(_)));

        drop(commands);
        drop(events);
        handle.join().unwrap();
    }

    #[derive(Clone, Default)]
    struct SharedFrames(Arc<Mutex<Vec<RgbaFrame>>>);

    impl RenderTarget for SharedFrames {
        fn draw(&mut self, frame: RgbaFrame) {
            if let Ok(mut frames) = self.0.lock() {
                frames.push(frame);
            }
        }
    }

    impl SharedFrames {
        fn count(&self) -> usize {
            self.0.lock().map(|frames| frames.len()).unwrap_or(0)
        }
    }

    fn pump_until<R: RenderTarget>(host: &mut SessionHost<R>, mut done: impl FnMut(&SessionHost<R>) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(host) {
            assert!(Instant::now() < deadline, "timed out pumping events");
            host.pump();
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn host_and_worker_end_to_end() {
        let (worker, commands, events) = worker();
        let handle = worker::spawn(worker.with_frame_interval(Duration::from_millis(1))).unwrap();

        let frames = SharedFrames::default();
        let store = temp_store("session");
        let mut host = SessionHost::new(commands, events, frames.clone(), store.clone());
        assert_eq!(host.state(), HostState::Idle);

        let rom = test_rom("TETRIS");
        host.load_rom(rom.clone()).unwrap();
        pump_until(&mut host, |h| {
            h.view().library.iter().any(|t| t == "TETRIS") && h.view().custom_palette == DEFAULT_PALETTE
        });

        assert_eq!(host.state(), HostState::Loaded);
        assert_eq!(host.view().game.as_ref().map(|g| g.rom_size.as_str()), Some("32 KiB in 1 bank"));
        assert_eq!(store.get("TETRIS").unwrap(), rom);

        host.start().unwrap();
        assert_eq!(host.state(), HostState::Running);
        pump_until(&mut host, |_| frames.count() >= 2);

        host.key_down("o").unwrap();
        pump_until(&mut host, |h| !h.view().oam_dump.is_empty());
        assert_eq!(host.state(), HostState::Running);

        // reload from the library goes back through Loaded
        host.load_from_library("TETRIS").unwrap();
        pump_until(&mut host, |h| h.state() == HostState::Loaded);
        assert_eq!(host.view().library, vec!["TETRIS".to_string()]);

        drop(host);
        handle.join().unwrap();
    }

    #[test]
    fn game_info_during_store_open_is_queued() {
        let (command_tx, _command_rx) = crossbeam_channel::unbounded();
        let (_event_tx, event_rx) = crossbeam_channel::unbounded();
        let store = temp_store("queued");
        let mut host = SessionHost::new(command_tx, event_rx, SharedFrames::default(), store.clone());

        let rom = test_rom("TETRIS");
        let info = GameInfo::from(&CartridgeHeader::parse(&rom).unwrap());
        host.load_rom(rom.clone()).unwrap();
        // no pump yet, so the host has not seen the store open
        host.handle_event(Event::GameInfo(info));

        pump_until(&mut host, |h| !h.view().library.is_empty());
        assert_eq!(store.get("TETRIS").unwrap(), rom);
    }

    #[test]
    fn broken_store_does_not_stop_the_session() {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (_event_tx, event_rx) = crossbeam_channel::unbounded();
        let store = temp_store("broken");
        std::fs::write(store.path(), b"not a zip").unwrap();
        let mut host = SessionHost::new(command_tx, event_rx, SharedFrames::default(), store);

        let rom = test_rom("TETRIS");
        let info = GameInfo::from(&CartridgeHeader::parse(&rom).unwrap());
        host.load_rom(rom).unwrap();
        host.handle_event(Event::GameInfo(info));

        pump_until(&mut host, |h| h.view().log.iter().any(|l| l.starts_with("auto-store disabled")));
        assert!(host.view().log.iter().any(|l| l == "'TETRIS' was not stored"));
        assert!(host.load_from_library("TETRIS").is_err());

        host.start().unwrap();
        assert_eq!(host.state(), HostState::Running);
        assert!(matches!(command_rx.try_iter().last(), Some(Command::Start)));
    }
}
