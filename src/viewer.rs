//! Zoomable, pannable image view with four-corner selection.
//!
//! Points live in image pixel coordinates; [`ViewTransform`] maps them to the
//! screen each frame, so zooming or panning never moves a selected corner.

use egui::{
    pos2, vec2, Align2, Color32, CursorIcon, FontId, Pos2, Rect, Sense, Stroke, TextureHandle,
    TextureOptions, Ui, Vec2,
};
use opencv::core::{Mat, Point2f};
use opencv::prelude::*;

use crate::config::{HANDLE_RADIUS, ZOOM_STEP};
use crate::error::Result;
use crate::geometry::{distance, order_points, Quad, CORNER_LABELS};
use crate::utils::to_color_image;

const HANDLE_COLOR: Color32 = Color32::from_rgba_premultiplied(0, 176, 224, 220);
const HANDLE_HOVER_COLOR: Color32 = Color32::from_rgba_premultiplied(224, 88, 0, 220);
const LINE_COLOR: Color32 = Color32::from_rgba_premultiplied(0, 180, 70, 180);
const LINE_WIDTH: f32 = 2.0;
const BACKGROUND: Color32 = Color32::from_rgb(30, 30, 30);

/// Corner picking and dragging, independent of rendering.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    points: Vec<Point2f>,
    placing: bool,
    dragging: Option<usize>,
}

impl Selection {
    /// Drop any previous corners and wait for four clicks.
    pub fn start(&mut self) {
        self.points.clear();
        self.dragging = None;
        self.placing = true;
    }

    pub fn cancel(&mut self) {
        self.points.clear();
        self.dragging = None;
        self.placing = false;
    }

    pub fn is_placing(&self) -> bool {
        self.placing
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == 4
    }

    pub fn points(&self) -> &[Point2f] {
        &self.points
    }

    /// Returns true when this click placed the fourth corner. The corners are
    /// then sorted so their labels read TL, TR, BR, BL.
    pub fn add_point(&mut self, p: Point2f) -> bool {
        if !self.placing || self.points.len() >= 4 {
            return false;
        }
        self.points.push(p);
        if self.points.len() < 4 {
            return false;
        }
        self.placing = false;
        if let Ok(quad) = order_points(&self.points) {
            // duplicate clicks can make one point win two roles; keep the
            // click order then and let validation reject it at extract time
            if quad.validate().is_ok() {
                self.points = quad.corners.to_vec();
            }
        }
        true
    }

    /// Nearest corner within `max_dist` of `p`.
    pub fn handle_at(&self, p: Point2f, max_dist: f32) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, &q)| (i, distance(p, q)))
            .filter(|&(_, d)| d <= max_dist)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn begin_drag(&mut self, index: usize) {
        if index < self.points.len() {
            self.dragging = Some(index);
        }
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    pub fn drag_to(&mut self, p: Point2f) {
        if let Some(i) = self.dragging {
            self.points[i] = p;
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    /// Handle under a screen position, with `radius` in screen pixels.
    pub fn handle_under(
        &self,
        transform: &ViewTransform,
        view: Rect,
        screen: Pos2,
        radius: f32,
    ) -> Option<usize> {
        self.handle_at(transform.to_image(view, screen), radius / transform.zoom)
    }

    /// Current corners, re-sorted in case a drag crossed two of them.
    pub fn quad(&self) -> Option<Quad> {
        if !self.is_complete() {
            return None;
        }
        order_points(&self.points).ok()
    }
}

/// Image-to-screen mapping: `screen = origin + offset + image * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    /// Largest zoom that shows the whole image, centred.
    pub fn fit(image_size: Vec2, view: Rect) -> Self {
        if image_size.x <= 0.0 || image_size.y <= 0.0 || !view.is_positive() {
            return Self::default();
        }
        let zoom = (view.width() / image_size.x).min(view.height() / image_size.y);
        let offset = (view.size() - image_size * zoom) / 2.0;
        Self { zoom, offset }
    }

    pub fn to_screen(&self, view: Rect, p: Point2f) -> Pos2 {
        view.min + self.offset + vec2(p.x, p.y) * self.zoom
    }

    pub fn to_image(&self, view: Rect, p: Pos2) -> Point2f {
        let v = (p - view.min - self.offset) / self.zoom;
        Point2f::new(v.x, v.y)
    }

    /// Scale by `factor` keeping the image point under `anchor` in place.
    pub fn zoom_at(&mut self, view: Rect, anchor: Pos2, factor: f32) {
        let fixed = self.to_image(view, anchor);
        self.zoom *= factor;
        self.offset = anchor - view.min - vec2(fixed.x, fixed.y) * self.zoom;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }
}

pub enum ViewerEvent {
    None,
    PointsReady,
}

#[derive(Default)]
pub struct ImageViewer {
    texture: Option<TextureHandle>,
    image_size: Vec2,
    transform: ViewTransform,
    needs_fit: bool,
    pub selection: Selection,
}

impl ImageViewer {
    /// Show `image` and reset the selection and view.
    pub fn set_image(&mut self, ctx: &egui::Context, image: &Mat) -> Result<()> {
        let color = to_color_image(image)?;
        self.image_size = vec2(image.cols() as f32, image.rows() as f32);
        self.texture = Some(ctx.load_texture("viewer", color, TextureOptions::LINEAR));
        self.selection.cancel();
        self.needs_fit = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.texture = None;
        self.selection.cancel();
    }

    pub fn has_image(&self) -> bool {
        self.texture.is_some()
    }

    pub fn fit(&mut self) {
        self.needs_fit = true;
    }

    pub fn show(&mut self, ui: &mut Ui) -> ViewerEvent {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let view = response.rect;
        painter.rect_filled(view, 0.0, BACKGROUND);

        let Some(texture) = &self.texture else {
            painter.text(
                view.center(),
                Align2::CENTER_CENTER,
                "Open a folder to begin",
                FontId::proportional(16.0),
                Color32::GRAY,
            );
            return ViewerEvent::None;
        };

        // a minimized window reports an empty view; fit once it has a size
        if self.needs_fit && view.is_positive() {
            self.transform = ViewTransform::fit(self.image_size, view);
            self.needs_fit = false;
        }

        if let Some(hover) = response.hover_pos() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let factor = if scroll > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                self.transform.zoom_at(view, hover, factor);
            }
        }

        let mut event = ViewerEvent::None;

        if self.selection.is_placing() {
            ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if self.selection.add_point(self.transform.to_image(view, pos)) {
                        event = ViewerEvent::PointsReady;
                    }
                }
            }
        } else {
            if response.drag_started() {
                // egui reports the drag only after the pointer left the click
                // threshold, so hit-test where the button went down
                let press = ui
                    .input(|i| i.pointer.press_origin())
                    .or_else(|| response.interact_pointer_pos());
                if let Some(pos) = press {
                    let grabbed =
                        self.selection
                            .handle_under(&self.transform, view, pos, HANDLE_RADIUS);
                    if let Some(i) = grabbed {
                        self.selection.begin_drag(i);
                    }
                }
            }
            if response.dragged() {
                match (self.selection.dragging(), response.interact_pointer_pos()) {
                    (Some(_), Some(pos)) => {
                        self.selection.drag_to(self.transform.to_image(view, pos));
                    }
                    _ => self.transform.pan(response.drag_delta()),
                }
            }
            if response.drag_stopped() {
                self.selection.end_drag();
            }
        }

        let image_rect = Rect::from_min_size(
            self.transform.to_screen(view, Point2f::new(0.0, 0.0)),
            self.image_size * self.transform.zoom,
        );
        let painter = painter.with_clip_rect(view);
        painter.image(
            texture.id(),
            image_rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        let screen: Vec<Pos2> = self
            .selection
            .points()
            .iter()
            .map(|&p| self.transform.to_screen(view, p))
            .collect();

        if screen.len() == 4 {
            let stroke = Stroke::new(LINE_WIDTH, LINE_COLOR);
            for i in 0..4 {
                painter.line_segment([screen[i], screen[(i + 1) % 4]], stroke);
            }
        }

        let hovered = response
            .hover_pos()
            .and_then(|pos| {
                self.selection
                    .handle_under(&self.transform, view, pos, HANDLE_RADIUS)
            });
        if hovered.is_some() && !self.selection.is_placing() {
            ui.ctx().set_cursor_icon(CursorIcon::Move);
        }

        for (i, &center) in screen.iter().enumerate() {
            let fill = if hovered == Some(i) || self.selection.dragging() == Some(i) {
                HANDLE_HOVER_COLOR
            } else {
                HANDLE_COLOR
            };
            painter.circle(center, HANDLE_RADIUS, fill, Stroke::new(1.0, Color32::WHITE));
            painter.text(
                center + vec2(HANDLE_RADIUS + 2.0, -HANDLE_RADIUS - 2.0),
                Align2::LEFT_BOTTOM,
                CORNER_LABELS[i],
                FontId::monospace(11.0),
                Color32::YELLOW,
            );
        }

        event
    }
}
