use crate::renderer::Host;
use bridge_core::host::{format_hex_color, parse_hex_color};
use bridge_core::palette::{PaletteKind, PALETTE_SIZE};
use egui::{ComboBox, TextEdit};
use log::warn;

pub struct PaletteWidget {
    hex: [String; PALETTE_SIZE],
}

impl PaletteWidget {
    pub fn new() -> Self {
        Self {
            hex: Default::default(),
        }
    }

    pub fn render_content(&mut self, ui: &mut egui::Ui, host: &mut Host) {
        let mut selection = host.view().palette;
        ComboBox::from_label("Palette")
            .selected_text(selection.name())
            .show_ui(ui, |ui| {
                for kind in PaletteKind::ALL {
                    ui.selectable_value(&mut selection, kind, kind.name());
                }
            });
        if selection != host.view().palette {
            let _ = host.select_palette(selection);
        }

        let mut colors = host.view().custom_palette;
        let mut changed = false;

        for (i, color) in colors.iter_mut().enumerate() {
            let hex = &mut self.hex[i];
            ui.horizontal(|ui| {
                ui.label(format!("{}", i));

                let mut rgb = [color[0], color[1], color[2]];
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    *color = [rgb[0], rgb[1], rgb[2], 0xFF];
                    changed = true;
                }

                let response = ui.add(TextEdit::singleline(&mut *hex).desired_width(70.0).font(egui::TextStyle::Monospace));
                if response.lost_focus() {
                    match parse_hex_color(hex) {
                        Ok(parsed) => {
                            *color = parsed;
                            changed = true;
                        }
                        Err(err) => warn!("{}", err),
                    }
                }
                if !response.has_focus() {
                    *hex = format_hex_color(*color);
                }
            });
        }

        if changed {
            let _ = host.set_custom_palette(colors);
        }
    }
}
