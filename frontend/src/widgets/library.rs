use crate::renderer::Host;
use egui::RichText;
use log::error;

pub fn render_library(ui: &mut egui::Ui, host: &mut Host) {
    if !host.store().is_open() {
        ui.label(RichText::new("Library unavailable").italics());
        return;
    }
    if host.view().library.is_empty() {
        ui.label(RichText::new("Loaded ROMs are stored here").italics());
        return;
    }

    let titles = host.view().library.clone();
    for title in titles {
        if ui.button(format!("{} {}", egui_phosphor::regular::PLAY, title)).clicked() {
            if let Err(err) = host.load_from_library(&title) {
                error!("{}", err);
            }
        }
    }
}
