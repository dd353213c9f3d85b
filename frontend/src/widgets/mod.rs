use egui::Color32;

pub mod debug;
pub mod game;
pub mod library;
pub mod palette;

const LABEL_COLOR: Color32 = Color32::from_rgba_premultiplied(193, 225, 193, 255);
