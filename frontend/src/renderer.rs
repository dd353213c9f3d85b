use crate::rom::read_rom;
use crate::widgets::debug::DebugWidget;
use crate::widgets::game::render_game_info;
use crate::widgets::library::render_library;
use crate::widgets::palette::PaletteWidget;
use bridge_core::host::{HostState, RenderTarget, SessionHost};
use bridge_core::input::KeyMap;
use bridge_core::palette::PaletteKind;
use bridge_core::protocol::{CommandSender, EventReceiver};
use bridge_core::store::RomStore;
use bridge_core::video::{RgbaFrame, SCREEN_HEIGHT, SCREEN_WIDTH};
use eframe::egui::{vec2, CentralPanel, Color32, ColorImage, Context, Image, TextureHandle, TextureOptions};
use eframe::{App, CreationContext};
use egui::{Align2, CollapsingHeader, Key, Modifiers, RichText, ScrollArea, SidePanel, TextEdit, TopBottomPanel, Window};
use egui_extras::{Column, TableBuilder};
use lazy_static::lazy_static;
use log::error;
use std::collections::HashMap;
use std::path::Path;

pub const SCALE: usize = 4;
pub const INSPECTOR_WIDTH: f32 = 360.0;

lazy_static! {
    /// egui key -> the key name used by key bindings. Letters and digits not
    /// listed here use their lowercase egui name.
    static ref KEY_NAMES: HashMap<Key, &'static str> = HashMap::from([
        (Key::Space, " "),
        (Key::Enter, "Enter"),
        (Key::Comma, ","),
        (Key::Period, "."),
        (Key::Minus, "-"),
        (Key::ArrowUp, "ArrowUp"),
        (Key::ArrowDown, "ArrowDown"),
        (Key::ArrowLeft, "ArrowLeft"),
        (Key::ArrowRight, "ArrowRight"),
        (Key::Backspace, "Backspace"),
        (Key::Tab, "Tab"),
        (Key::Escape, "Escape"),
    ]);
}

fn key_name(key: Key) -> String {
    KEY_NAMES
        .get(&key)
        .map(|name| name.to_string())
        .unwrap_or_else(|| key.name().to_lowercase())
}

/// Key name and pressed state for every transition to forward. While a text
/// field has focus only releases get through, so nothing stays latched.
fn key_transitions(keys: &[(Key, bool)], now: Modifiers, before: Modifiers, typing: bool) -> Vec<(String, bool)> {
    let mut transitions: Vec<(String, bool)> = keys
        .iter()
        .filter(|(_, pressed)| !(typing && *pressed))
        .map(|&(key, pressed)| (key_name(key), pressed))
        .collect();

    // modifiers never show up as key events
    for (name, now, before) in [("Shift", now.shift, before.shift), ("Control", now.ctrl, before.ctrl)] {
        if now && !before && !typing {
            transitions.push((name.to_string(), true));
        } else if !now && before {
            transitions.push((name.to_string(), false));
        }
    }
    transitions
}

/// The emulator screen as an egui texture.
pub struct Screen {
    texture: TextureHandle,
}

impl RenderTarget for Screen {
    fn draw(&mut self, frame: RgbaFrame) {
        let image = ColorImage::from_rgba_unmultiplied([SCREEN_WIDTH, SCREEN_HEIGHT], frame.as_bytes());
        self.texture.set(image, TextureOptions::NEAREST);
    }
}

pub type Host = SessionHost<Screen>;

pub struct Renderer {
    host: Host,
    palette: PaletteWidget,
    debug: DebugWidget,
    rom_path: String,
    modifiers: Modifiers,
}

impl Renderer {
    pub fn new(
        cc: &CreationContext, commands: CommandSender, events: EventReceiver, store: RomStore, keymap: KeyMap,
        palette: PaletteKind, rom: Option<(String, Vec<u8>)>,
    ) -> Renderer {
        let texture = cc.egui_ctx.load_texture(
            "screen_texture",
            ColorImage::new([SCREEN_WIDTH, SCREEN_HEIGHT], Color32::BLACK),
            TextureOptions::NEAREST,
        );

        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let mut host = SessionHost::new(commands, events, Screen { texture }, store).with_keymap(keymap);
        if palette != PaletteKind::Default {
            let _ = host.select_palette(palette);
        }

        let mut rom_path = String::new();
        if let Some((path, rom)) = rom {
            rom_path = path;
            let _ = host.load_rom(rom);
        }

        Renderer {
            host,
            palette: PaletteWidget::new(),
            debug: DebugWidget::new(),
            rom_path,
            modifiers: Modifiers::default(),
        }
    }

    pub fn handle_input(&mut self, ctx: &Context) {
        let typing = ctx.wants_keyboard_input();
        let (keys, modifiers) = ctx.input(|i| {
            let keys: Vec<(Key, bool)> = i
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed,
                        repeat: false,
                        ..
                    } => Some((*key, *pressed)),
                    _ => None,
                })
                .collect();
            (keys, i.modifiers)
        });

        for (name, pressed) in key_transitions(&keys, modifiers, self.modifiers, typing) {
            let _ = if pressed {
                self.host.key_down(&name)
            } else {
                self.host.key_up(&name)
            };
        }
        self.modifiers = modifiers;
    }

    fn load_rom_from_path(&mut self) {
        match read_rom(Path::new(self.rom_path.trim())) {
            Ok(rom) => {
                let _ = self.host.load_rom(rom);
            }
            Err(err) => {
                error!("Failed to read ROM {}: {}", self.rom_path, err);
                self.host.report(format!("failed to read ROM: {}", err));
            }
        }
    }

    fn render_toolbar(&mut self, ctx: &Context) {
        TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let response = ui.add(TextEdit::singleline(&mut self.rom_path).hint_text("path/to/rom.gb"));
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
                if ui.button("Load ROM").clicked() || submitted {
                    self.load_rom_from_path();
                }

                let startable = self.host.state() == HostState::Loaded;
                if ui
                    .add_enabled(startable, egui::Button::new(format!("{} Start", egui_phosphor::regular::PLAY)))
                    .clicked()
                {
                    let _ = self.host.start();
                }

                if !self.host.is_worker_alive() {
                    ui.label(RichText::new("emulation worker stopped").color(Color32::LIGHT_RED));
                }
            });
        });
    }

    fn render_inspector(&mut self, ctx: &Context) {
        SidePanel::right("inspector")
            .exact_width(INSPECTOR_WIDTH)
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    CollapsingHeader::new("Cartridge").default_open(true).show(ui, |ui| {
                        render_game_info(ui, self.host.view().game.as_ref());
                    });
                    CollapsingHeader::new("Palette").default_open(true).show(ui, |ui| {
                        self.palette.render_content(ui, &mut self.host);
                    });
                    CollapsingHeader::new("Debug").show(ui, |ui| {
                        self.debug.render_content(ui, &mut self.host);
                    });
                    CollapsingHeader::new("Library").show(ui, |ui| {
                        render_library(ui, &mut self.host);
                    });
                    CollapsingHeader::new("Log").default_open(true).show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_source("log")
                            .max_height(160.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for line in &self.host.view().log {
                                    ui.label(RichText::new(line).monospace());
                                }
                            });
                    });
                });
            });
    }

    fn render_controls(&self, ctx: &Context) {
        let mut bindings: Vec<(String, String)> = self
            .host
            .keymap()
            .iter()
            .map(|(key, button)| {
                let key = if key == " " { "Space".to_string() } else { key.to_string() };
                (key, button.name().to_string())
            })
            .collect();
        bindings.sort_by(|a, b| a.1.cmp(&b.1));

        Window::new("Controls")
            .anchor(Align2::CENTER_CENTER, vec2(0.0, 0.0))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                TableBuilder::new(ui)
                    .columns(Column::auto(), 2)
                    .header(0.0, |mut header| {
                        header.col(|ui| {
                            ui.label(RichText::new("Key").italics());
                        });
                        header.col(|ui| {
                            ui.label(RichText::new("Action").italics());
                        });
                    })
                    .body(|mut body| {
                        for (key, action) in &bindings {
                            body.row(0.0, |mut row| {
                                row.col(|ui| {
                                    ui.label(RichText::new(key).strong());
                                });
                                row.col(|ui| {
                                    ui.label(action);
                                });
                            });
                        }
                    });
            });
    }
}

impl App for Renderer {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);
        self.host.pump();

        self.render_toolbar(ctx);
        self.render_inspector(ctx);

        CentralPanel::default().show(ctx, |ui| {
            let image = Image::new(&self.host.target().texture);
            let image = image.fit_to_exact_size(vec2((SCREEN_WIDTH * SCALE) as f32, (SCREEN_HEIGHT * SCALE) as f32));
            ui.centered_and_justified(|ui| ui.add(image));
        });

        if self.host.state() == HostState::Idle {
            self.render_controls(ctx);
        }

        ctx.request_repaint();
    }
}
