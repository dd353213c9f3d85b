use crate::renderer::Host;
use bridge_core::input::Button;
use egui::{RichText, ScrollArea, TextEdit};

#[derive(PartialEq, Eq, Clone, Copy)]
enum DumpView {
    Cpu,
    Memory,
    Oam,
    Vram,
}

impl DumpView {
    const ALL: [DumpView; 4] = [DumpView::Cpu, DumpView::Memory, DumpView::Oam, DumpView::Vram];

    fn label(&self) -> &'static str {
        match self {
            DumpView::Cpu => "CPU",
            DumpView::Memory => "Memory",
            DumpView::Oam => "OAM",
            DumpView::Vram => "VRAM",
        }
    }
}

pub struct DebugWidget {
    view: DumpView,
    start: String,
    end: String,
}

impl DebugWidget {
    pub fn new() -> Self {
        Self {
            view: DumpView::Cpu,
            start: "0xC000".to_string(),
            end: "0xC100".to_string(),
        }
    }

    pub fn render_content(&mut self, ui: &mut egui::Ui, host: &mut Host) {
        ui.horizontal(|ui| {
            if ui.button(format!("{} Step", egui_phosphor::regular::STEPS)).clicked() {
                let _ = host.press(Button::Step);
            }
            if ui.button(format!("{} Pause", egui_phosphor::regular::PAUSE)).clicked() {
                let _ = host.press(Button::Pause);
            }
            if ui.button(format!("{} Resume", egui_phosphor::regular::PLAY)).clicked() {
                let _ = host.press(Button::Resume);
            }
        });

        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut self.start).desired_width(60.0));
            ui.label("..");
            ui.add(TextEdit::singleline(&mut self.end).desired_width(60.0));
            if ui.button(format!("{} Dump", egui_phosphor::regular::ARROW_CLOCKWISE)).clicked() {
                // parse errors already end up in the log
                if host.request_memory(&self.start, &self.end).is_ok() {
                    self.view = DumpView::Memory;
                }
            }
        });

        ui.horizontal(|ui| {
            for view in DumpView::ALL {
                ui.selectable_value(&mut self.view, view, view.label());
            }
            let refresh = match self.view {
                DumpView::Oam => Some(Button::DumpOam),
                DumpView::Vram => Some(Button::DumpVram),
                _ => None,
            };
            if let Some(button) = refresh {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                    if ui.button(format!("{} Refresh", egui_phosphor::regular::BUG)).clicked() {
                        let _ = host.press(button);
                    }
                });
            }
        });

        ui.separator();

        let text = match self.view {
            DumpView::Cpu => &host.view().cpu_trace,
            DumpView::Memory => &host.view().memory_dump,
            DumpView::Oam => &host.view().oam_dump,
            DumpView::Vram => &host.view().vram_dump,
        };
        ScrollArea::both()
            .id_source("debug_dump")
            .max_height(240.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                ui.label(RichText::new(text.as_str()).monospace());
            });
    }
}
