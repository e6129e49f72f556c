use egui::{Color32, Rounding, Stroke, Visuals};

pub const WINDOW: Color32 = Color32::from_rgb(43, 43, 43);
pub const BASE: Color32 = Color32::from_rgb(30, 30, 30);
pub const BUTTON: Color32 = Color32::from_rgb(58, 63, 71);
pub const BUTTON_HOVER: Color32 = Color32::from_rgb(80, 86, 94);
pub const BORDER: Color32 = Color32::from_rgb(85, 85, 85);
pub const TEXT: Color32 = Color32::from_rgb(221, 221, 221);
pub const SELECTION: Color32 = Color32::from_rgb(38, 79, 120);
pub const HIGHLIGHT: Color32 = Color32::from_rgb(42, 130, 218);

pub fn dark_visuals() -> Visuals {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT);
    visuals.window_fill = WINDOW;
    visuals.panel_fill = WINDOW;
    visuals.extreme_bg_color = BASE;
    visuals.faint_bg_color = Color32::from_rgb(50, 50, 50);
    visuals.selection.bg_fill = SELECTION;
    visuals.selection.stroke = Stroke::new(1.0, HIGHLIGHT);
    visuals.hyperlink_color = HIGHLIGHT;

    let rounding = Rounding::same(4.0);
    let widgets = &mut visuals.widgets;
    widgets.inactive.weak_bg_fill = BUTTON;
    widgets.inactive.bg_fill = BUTTON;
    widgets.inactive.bg_stroke = Stroke::new(1.0, BORDER);
    widgets.inactive.rounding = rounding;
    widgets.hovered.weak_bg_fill = BUTTON_HOVER;
    widgets.hovered.bg_fill = BUTTON_HOVER;
    widgets.hovered.rounding = rounding;
    widgets.active.rounding = rounding;
    widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER);
    visuals
}

pub fn apply(ctx: &egui::Context) {
    ctx.set_visuals(dark_visuals());
}
