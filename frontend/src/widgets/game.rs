use super::LABEL_COLOR;
use bridge_core::protocol::GameInfo;
use egui::RichText;
use egui_extras::{Column, TableBuilder};

pub fn render_game_info(ui: &mut egui::Ui, info: Option<&GameInfo>) {
    let Some(info) = info else {
        ui.label(RichText::new("No cartridge loaded").italics());
        return;
    };

    let rows = [
        ("Title", info.title.clone()),
        ("Type", info.cartridge_type.clone()),
        ("ROM", info.rom_size.clone()),
        ("RAM", info.ram_size.clone()),
        ("CGB", info.cgb_flag.clone()),
        ("SGB", info.sgb_flag.clone()),
        ("Region", if info.non_japanese { "Non-Japanese" } else { "Japanese" }.to_string()),
    ];

    TableBuilder::new(ui)
        .columns(Column::auto(), 2)
        .body(|mut body| {
            for (label, value) in rows {
                body.row(0.0, |mut row| {
                    row.col(|ui| {
                        ui.label(RichText::new(label).strong().color(LABEL_COLOR));
                    });
                    row.col(|ui| {
                        ui.label(RichText::new(value).monospace());
                    });
                });
            }
        });
}
