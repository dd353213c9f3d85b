mod renderer;
mod replay;
mod rom;
mod widgets;

use crate::renderer::{INSPECTOR_WIDTH, SCALE};
use bridge_core::engine::HeadlessEngine;
use bridge_core::input::KeyMap;
use bridge_core::palette::PaletteKind;
use bridge_core::protocol::{CommandReceiver, CommandSender, EventReceiver, EventSender};
use bridge_core::store::RomStore;
use bridge_core::video::{SCREEN_HEIGHT, SCREEN_WIDTH};
use bridge_core::worker::{self, WorkerEndpoint};
use clap::Parser;
use eframe::NativeOptions;
use log::{error, info, LevelFilter};
use renderer::Renderer;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
struct Args {
    /// Enable trace-level logging (highest verbosity, incl. every command and key event)
    #[arg(long)]
    trace: bool,

    /// Enable debug-level logging
    #[arg(long)]
    debug: bool,

    /// Path to the ROM file (.gb/.gbc, or a .zip containing one)
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Path to the ROM library archive
    #[arg(long, default_value = "gbbridge-roms.zip")]
    store: PathBuf,

    /// Initial palette: default, bw or custom
    #[arg(long, default_value = "default")]
    palette: PaletteKind,

    /// Frames per second while free-running, 0 for unpaced
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Rebind a key, e.g. --bind j=a or --bind ArrowUp=up (repeatable)
    #[arg(long = "bind", value_name = "KEY=BUTTON")]
    bindings: Vec<String>,

    /// JSON-lines file of command envelopes sent to the worker at startup
    #[arg(long)]
    commands: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let level = if args.trace {
        LevelFilter::Trace
    } else if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level(module_path!(), level)
        .with_module_level("bridge_core", level)
        .init()
        .unwrap();

    let mut keymap = KeyMap::default();
    if let Err(err) = keymap.apply_overrides(args.bindings.iter().map(String::as_str)) {
        error!("{}", err);
        process::exit(1);
    }

    let rom = args.rom.as_ref().map(|path| match rom::read_rom(path) {
        Ok(rom) => (path.display().to_string(), rom),
        Err(err) => {
            error!("Failed to read ROM {}: {}", path.display(), err);
            process::exit(1);
        }
    });

    let (command_tx, command_rx): (CommandSender, CommandReceiver) = crossbeam_channel::bounded(25);
    let (event_tx, event_rx): (EventSender, EventReceiver) = crossbeam_channel::bounded(25);

    let mut endpoint: WorkerEndpoint<HeadlessEngine> = WorkerEndpoint::new(command_rx, event_tx);
    if args.fps > 0 {
        endpoint = endpoint.with_frame_interval(Duration::from_secs_f64(1.0 / args.fps as f64));
    }
    if let Err(err) = worker::spawn(endpoint) {
        error!("Failed to start the emulation worker: {}", err);
        process::exit(1);
    }

    // replay off the UI thread: a long script would otherwise block on the
    // bounded channels before anything drains events
    if let Some(path) = args.commands.clone() {
        let commands = command_tx.clone();
        let spawned = thread::Builder::new().name("replay".to_string()).spawn(move || {
            match replay::replay_commands(&path, &commands) {
                Ok(sent) => info!("Replayed {} commands from {}", sent, path.display()),
                Err(err) => error!("Failed to read {}: {}", path.display(), err),
            }
        });
        if let Err(err) = spawned {
            error!("Failed to start command replay: {}", err);
        }
    }

    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([
                (SCREEN_WIDTH * SCALE) as f32 + INSPECTOR_WIDTH + 32.0,
                (SCREEN_HEIGHT * SCALE) as f32 + 48.0,
            ])
            .with_resizable(true),
        vsync: false,
        default_theme: eframe::Theme::Dark,
        ..Default::default()
    };

    let store = RomStore::new(args.store);
    let palette = args.palette;
    let result = eframe::run_native(
        "gbbridge",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(Renderer::new(
                cc, command_tx, event_rx, store, keymap, palette, rom,
            )))
        }),
    );

    if let Err(err) = result {
        error!("{}", err);
        process::exit(1);
    }
}
