use std::path::{Path, PathBuf};

use eframe::{egui, Frame};
use egui::{
    vec2, Button, CentralPanel, Context, Key, KeyboardShortcut, Modifiers, ScrollArea, SidePanel,
    TextEdit, TextureHandle, TextureOptions, TopBottomPanel, ViewportCommand,
};
use log::{error, info, warn};
use opencv::core::Mat;
use opencv::prelude::*;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use tokio::runtime::Runtime;

use crate::browser::list_images;
use crate::config::{Config, FINAL_H, FINAL_W, NUM_SEGMENTS};
use crate::error::{ExtractorError, Result};
use crate::saver::{save_segments, validate_label};
use crate::segment::segment_strip;
use crate::theme;
use crate::utils::{read_color, rotate_image, to_color_image};
use crate::viewer::{ImageViewer, ViewerEvent};
use crate::warp::{spawn_warp, PendingWarp};

pub const APP_TITLE: &str = "DigitExtractor — Image Dataset Extractor";

const STRIP_SCALE: f32 = 3.0;
const CELL_PREVIEW: f32 = 56.0;

const OPEN_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::O);
const QUIT_SHORTCUT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Q);

enum Action {
    OpenFolder,
    SelectFile(usize),
    StartSelection,
    CancelSelection,
    PointsReady,
    Extract,
    Save,
    SetOutputDir,
    Rotate(f32),
    Fit,
    Quit,
}

/// Processed strip and its cells, plus the textures showing them.
#[derive(Default)]
struct Preview {
    strip: Option<TextureHandle>,
    cells: Vec<TextureHandle>,
    segments: Vec<Mat>,
}

impl Preview {
    fn set_strip(&mut self, ctx: &Context, strip: &Mat) -> Result<()> {
        let segments = segment_strip(strip, NUM_SEGMENTS)?;
        self.strip = Some(ctx.load_texture(
            "strip",
            to_color_image(strip)?,
            TextureOptions::NEAREST,
        ));
        self.cells = segments
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                Ok(ctx.load_texture(
                    format!("cell_{i}"),
                    to_color_image(cell)?,
                    TextureOptions::NEAREST,
                ))
            })
            .collect::<Result<_>>()?;
        self.segments = segments;
        Ok(())
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_ready(&self) -> bool {
        self.segments.len() == NUM_SEGMENTS
    }
}

pub struct ExtractorApp {
    config: Config,
    runtime: Runtime,
    files: Vec<PathBuf>,
    current: Option<usize>,
    original: Option<Mat>,
    /// `original` after rotation; this is what the viewer shows and warps.
    working: Option<Mat>,
    rotation: f32,
    viewer: ImageViewer,
    points_ready: bool,
    pending: Option<PendingWarp>,
    preview: Preview,
    label: String,
    output_dir: Option<PathBuf>,
    status: String,
}

impl ExtractorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Result<Self> {
        theme::apply(&cc.egui_ctx);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("warp-worker")
            .build()?;

        let mut app = Self {
            output_dir: config.output_dir.clone(),
            config,
            runtime,
            files: vec![],
            current: None,
            original: None,
            working: None,
            rotation: 0.0,
            viewer: ImageViewer::default(),
            points_ready: false,
            pending: None,
            preview: Preview::default(),
            label: String::new(),
            status: "Ready — open a folder to begin.".to_string(),
        };
        if let Some(dir) = app.config.input_dir.clone() {
            app.load_folder(&cc.egui_ctx, &dir);
        }
        Ok(app)
    }

    fn load_folder(&mut self, ctx: &Context, folder: &Path) {
        let files = match list_images(folder) {
            Ok(files) => files,
            Err(e) => return self.report_error("Load Error", &e),
        };
        if files.is_empty() {
            warn!("no images in {}", folder.display());
            show_message(MessageLevel::Info, "No Images", "No supported image files found.");
            return;
        }
        info!("loaded {} images from {}", files.len(), folder.display());
        self.status = format!("Loaded {} images from {}", files.len(), folder.display());
        self.files = files;
        self.select_file(ctx, 0);
    }

    fn select_file(&mut self, ctx: &Context, index: usize) {
        let Some(path) = self.files.get(index).cloned() else {
            return;
        };
        self.current = Some(index);
        self.reset_extraction();
        match read_color(&path) {
            Ok(image) => {
                self.original = Some(image);
                self.rotation = 0.0;
                self.refresh_working(ctx);
                self.status = format!("Viewing: {}", file_name(&path));
            }
            Err(e) => {
                self.original = None;
                self.working = None;
                self.viewer.clear();
                self.report_error("Load Error", &e);
            }
        }
    }

    /// Re-derive the working image from the original and current rotation.
    fn refresh_working(&mut self, ctx: &Context) {
        let Some(original) = &self.original else {
            return;
        };
        let result = rotate_image(original, self.rotation as f64).and_then(|rotated| {
            self.viewer.set_image(ctx, &rotated)?;
            Ok(rotated)
        });
        match result {
            Ok(rotated) => self.working = Some(rotated),
            Err(e) => self.report_error("Rotation Error", &e),
        }
        self.reset_extraction();
    }

    fn reset_extraction(&mut self) {
        self.points_ready = false;
        self.pending = None;
        self.preview.clear();
    }

    fn extract(&mut self, ctx: &Context) {
        let (Some(quad), Some(image)) = (self.viewer.selection.quad(), &self.working) else {
            return;
        };
        let image = match image.try_clone() {
            Ok(image) => image,
            Err(e) => return self.report_error("Processing Error", &e.into()),
        };
        let repaint = ctx.clone();
        self.pending = Some(spawn_warp(
            self.runtime.handle(),
            image,
            quad,
            self.config.warp,
            move || repaint.request_repaint(),
        ));
        self.status = "Processing…".to_string();
    }

    fn poll_warp(&mut self, ctx: &Context) {
        let Some(result) = self.pending.as_mut().and_then(PendingWarp::poll) else {
            return;
        };
        self.pending = None;
        match result.and_then(|strip| self.preview.set_strip(ctx, &strip)) {
            Ok(()) => {
                info!("extracted {}x{} strip", FINAL_W, FINAL_H);
                self.status = "Extraction complete — enter a 5-char label and save.".to_string();
            }
            Err(e) => {
                self.preview.clear();
                self.report_error("Processing Error", &e);
                self.status = "Error during processing.".to_string();
            }
        }
    }

    fn pick_output_dir(&mut self) -> bool {
        match FileDialog::new().set_title("Select Output Folder").pick_folder() {
            Some(dir) => {
                self.status = format!("Output directory: {}", dir.display());
                self.output_dir = Some(dir);
                true
            }
            None => false,
        }
    }

    fn save(&mut self) {
        match check_before_save(&self.label, self.preview.is_ready()) {
            Ok(()) => {}
            Err(ExtractorError::NoSegments) => {
                show_message(MessageLevel::Warning, "No Segments", "Extract an image first.");
                return;
            }
            Err(e) => {
                show_message(MessageLevel::Warning, "Invalid Label", &e.to_string());
                return;
            }
        }
        if self.output_dir.is_none() && !self.pick_output_dir() {
            return;
        }
        let Some(root) = self.output_dir.clone() else {
            return self.report_error("Save Error", &ExtractorError::NoOutputDir);
        };
        match save_segments(&root, &self.label, &self.preview.segments) {
            Ok(report) => {
                let label = self.label.trim();
                self.status = format!(
                    "Saved {} segments for label '{}' → {}",
                    report.written.len(),
                    label,
                    root.display()
                );
                let folders: Vec<String> = report.folders.iter().map(char::to_string).collect();
                show_message(
                    MessageLevel::Info,
                    "Saved",
                    &format!(
                        "Saved {} segment(s) into:\n{}\n\nFolders: {}",
                        report.written.len(),
                        root.display(),
                        folders.join(", ")
                    ),
                );
            }
            Err(e @ (ExtractorError::LabelLength { .. } | ExtractorError::LabelCharacter(_))) => {
                show_message(MessageLevel::Warning, "Invalid Label", &e.to_string());
            }
            Err(e) => self.report_error("Save Error", &e),
        }
    }

    fn report_error(&mut self, title: &str, e: &ExtractorError) {
        error!("{}: {}", title, e);
        self.status = format!("{title}: {e}");
        show_message(MessageLevel::Error, title, &e.to_string());
    }

    fn apply(&mut self, ctx: &Context, action: Action) {
        match action {
            Action::OpenFolder => {
                if let Some(folder) = FileDialog::new().set_title("Select Image Folder").pick_folder() {
                    self.load_folder(ctx, &folder);
                }
            }
            Action::SelectFile(index) => self.select_file(ctx, index),
            Action::StartSelection => {
                self.reset_extraction();
                self.viewer.selection.start();
                self.status = "Click 4 corners on the image. Press Esc to cancel.".to_string();
            }
            Action::CancelSelection => {
                self.viewer.selection.cancel();
                self.points_ready = false;
            }
            Action::PointsReady => {
                self.points_ready = true;
                self.status = "4 points placed (auto-sorted). Drag handles to fine-tune, then click Extract."
                    .to_string();
            }
            Action::Extract => self.extract(ctx),
            Action::Save => self.save(),
            Action::SetOutputDir => {
                self.pick_output_dir();
            }
            Action::Rotate(degrees) => {
                self.rotation = wrap_degrees(degrees);
                self.refresh_working(ctx);
            }
            Action::Fit => self.viewer.fit(),
            Action::Quit => ctx.send_viewport_cmd(ViewportCommand::Close),
        }
    }

    fn shortcuts(&self, ctx: &Context, actions: &mut Vec<Action>) {
        ctx.input_mut(|i| {
            if i.consume_shortcut(&OPEN_SHORTCUT) {
                actions.push(Action::OpenFolder);
            }
            if i.consume_shortcut(&QUIT_SHORTCUT) {
                actions.push(Action::Quit);
            }
        });
        if ctx.wants_keyboard_input() {
            return;
        }
        ctx.input(|i| {
            if i.key_pressed(Key::Escape) {
                actions.push(Action::CancelSelection);
            }
            if i.key_pressed(Key::F) {
                actions.push(Action::Fit);
            }
        });
    }

    fn menu_bar(&self, ctx: &Context, actions: &mut Vec<Action>) {
        TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    let open = Button::new("Open Folder…").shortcut_text(ctx.format_shortcut(&OPEN_SHORTCUT));
                    if ui.add(open).clicked() {
                        actions.push(Action::OpenFolder);
                        ui.close_menu();
                    }
                    ui.separator();
                    let quit = Button::new("Quit").shortcut_text(ctx.format_shortcut(&QUIT_SHORTCUT));
                    if ui.add(quit).clicked() {
                        actions.push(Action::Quit);
                        ui.close_menu();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.add(Button::new("Fit Image").shortcut_text("F")).clicked() {
                        actions.push(Action::Fit);
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn file_list(&self, ctx: &Context, actions: &mut Vec<Action>) {
        SidePanel::left("files").min_width(180.0).show(ctx, |ui| {
            if ui.button("Open Folder…").clicked() {
                actions.push(Action::OpenFolder);
            }
            ui.separator();
            ScrollArea::vertical().show(ui, |ui| {
                for (i, path) in self.files.iter().enumerate() {
                    let selected = self.current == Some(i);
                    if ui.selectable_label(selected, file_name(path)).clicked() && !selected {
                        actions.push(Action::SelectFile(i));
                    }
                }
            });
        });
    }

    fn controls(&mut self, ctx: &Context, actions: &mut Vec<Action>) {
        TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.viewer.has_image(), Button::new("Select 4 Points"))
                    .clicked()
                {
                    actions.push(Action::StartSelection);
                }
                let can_extract = self.points_ready
                    && self.viewer.selection.is_complete()
                    && self.pending.is_none();
                if ui
                    .add_enabled(can_extract, Button::new("Extract & Preview"))
                    .clicked()
                {
                    actions.push(Action::Extract);
                }
                ui.add(
                    TextEdit::singleline(&mut self.label)
                        .hint_text("5-char label (e.g. A8B3Z)")
                        .char_limit(NUM_SEGMENTS)
                        .desired_width(160.0),
                );
                if ui
                    .add_enabled(self.preview.is_ready(), Button::new("Save Segments"))
                    .clicked()
                {
                    actions.push(Action::Save);
                }
                if ui.button("Set Output Dir…").clicked() {
                    actions.push(Action::SetOutputDir);
                }
            });
            ui.horizontal(|ui| {
                let enabled = self.original.is_some();
                ui.label("Rotation");
                let mut rotation = self.rotation;
                let slider = egui::Slider::new(&mut rotation, -180.0..=180.0).suffix("°");
                if ui.add_enabled(enabled, slider).changed() {
                    actions.push(Action::Rotate(rotation));
                }
                if ui.add_enabled(enabled, Button::new("⟲ 90°")).clicked() {
                    actions.push(Action::Rotate(self.rotation + 90.0));
                }
                if ui.add_enabled(enabled, Button::new("⟳ 90°")).clicked() {
                    actions.push(Action::Rotate(self.rotation - 90.0));
                }
                if ui.add_enabled(enabled && self.rotation != 0.0, Button::new("Reset")).clicked() {
                    actions.push(Action::Rotate(0.0));
                }
                if let Some(dir) = &self.output_dir {
                    ui.separator();
                    ui.weak(format!("Output: {}", dir.display()));
                }
            });
        });
    }

    fn preview_panel(&self, ctx: &Context) {
        TopBottomPanel::bottom("preview").show(ctx, |ui| {
            ui.vertical_centered(|ui| match &self.preview.strip {
                Some(strip) => {
                    let size = vec2(FINAL_W as f32, FINAL_H as f32) * STRIP_SCALE;
                    ui.image((strip.id(), size));
                }
                None => {
                    ui.label("No preview yet");
                }
            });
            ui.group(|ui| {
                ui.label(format!("Segments ({0}×{0})", FINAL_H));
                ui.horizontal(|ui| {
                    for i in 0..NUM_SEGMENTS {
                        match self.preview.cells.get(i) {
                            Some(cell) => {
                                ui.image((cell.id(), vec2(CELL_PREVIEW, CELL_PREVIEW)));
                            }
                            None => {
                                ui.allocate_space(vec2(CELL_PREVIEW, CELL_PREVIEW));
                            }
                        }
                    }
                });
            });
        });
    }
}

impl eframe::App for ExtractorApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        self.poll_warp(ctx);

        let mut actions = Vec::new();
        self.shortcuts(ctx, &mut actions);
        self.menu_bar(ctx, &mut actions);

        TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });
        self.preview_panel(ctx);
        self.controls(ctx, &mut actions);
        self.file_list(ctx, &mut actions);

        CentralPanel::default().show(ctx, |ui| {
            if let ViewerEvent::PointsReady = self.viewer.show(ui) {
                actions.push(Action::PointsReady);
            }
        });

        for action in actions {
            self.apply(ctx, action);
        }
    }
}

/// Label first, then segments; the output folder is only asked for after both pass.
fn check_before_save(label: &str, preview_ready: bool) -> Result<()> {
    validate_label(label, NUM_SEGMENTS)?;
    if !preview_ready {
        return Err(ExtractorError::NoSegments);
    }
    Ok(())
}

fn show_message(level: MessageLevel, title: &str, description: &str) {
    MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Map any angle into [-180, 180].
fn wrap_degrees(degrees: f32) -> f32 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && degrees > 0.0 {
        180.0
    } else {
        wrapped
    }
}
