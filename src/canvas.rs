//! Editor canvas: draws the plan image, every shape, and the in-progress
//! polygon draft, and multiplexes the pointer stream into pan / draw / drag
//! / select with one dispatcher evaluating guards in fixed priority order
//! (pan gesture > active drawing mode > shape drag > selection).

use eframe::egui;
use egui::{Align2, Color32, FontId, Pos2, Rect, Response, Sense, Shape, TextureHandle, Ui, Vec2};
use uuid::Uuid;

use crate::components::tools::Tool;
use crate::item::{DrawnItem, ItemKind, Point};
use crate::session::EditorSession;
use crate::settings::AppSettings;
use crate::theme;
use crate::viewport::{Viewport, EDITOR_ZOOM_RANGE};

/// The canvas never collapses below this height, whatever the window does.
pub const MIN_CANVAS_HEIGHT: f32 = 320.0;

/// One entry of the redraw-scoped hit index: the rendered screen-space
/// outline of a shape, keyed back to its item id. Rebuilt from scratch every
/// frame so it can never point at a removed or replaced shape.
struct HitTarget {
    id: Uuid,
    kind: ItemKind,
    screen_points: Vec<Pos2>,
    screen_radius: f32,
}

impl HitTarget {
    fn contains(&self, pos: Pos2) -> bool {
        match self.kind {
            ItemKind::Marker => {
                (pos - self.screen_points[0]).length() <= self.screen_radius
            }
            ItemKind::Polygon => screen_point_in_polygon(pos, &self.screen_points),
        }
    }
}

/// Live drag of a shape in Select mode. The original vertices are kept so
/// each motion re-derives the position from (origin + delta) instead of
/// accumulating rounding error.
struct ShapeDrag {
    id: Uuid,
    origin: Vec<Point>,
    start: Point,
}

pub struct Canvas {
    pub viewport: Viewport,
    texture: Option<TextureHandle>,
    image_size: Option<Vec2>,
    /// Set when a new image arrives; the fit transform needs the canvas rect
    /// and is therefore computed on the next frame.
    pending_fit: bool,
    hit_index: Vec<HitTarget>,
    drag: Option<ShapeDrag>,
    panning: bool,
    hover_model: Option<Point>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::new(EDITOR_ZOOM_RANGE),
            texture: None,
            image_size: None,
            pending_fit: false,
            hit_index: Vec::new(),
            drag: None,
            panning: false,
            hover_model: None,
        }
    }

    /// Install a freshly decoded plan image. The fit transform is recomputed
    /// on the next frame; shapes are untouched.
    pub fn set_image(&mut self, texture: TextureHandle, pixel_size: Vec2) {
        self.texture = Some(texture);
        self.image_size = Some(pixel_size);
        self.pending_fit = true;
    }

    /// Drop the image (load failure). Editing continues over a blank
    /// background.
    pub fn clear_image(&mut self) {
        self.texture = None;
        self.image_size = None;
    }

    pub fn has_image(&self) -> bool {
        self.texture.is_some()
    }

    /// Model coordinates under the pointer, for the status bar.
    pub fn hover_model(&self) -> Option<Point> {
        self.hover_model
    }

    pub fn fit_to_window(&mut self) {
        self.pending_fit = true;
    }

    pub fn show(&mut self, ui: &mut Ui, session: &mut EditorSession, settings: &AppSettings) {
        let available = ui.available_size();
        let size = Vec2::new(available.x, available.y.max(MIN_CANVAS_HEIGHT));
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        self.viewport.set_canvas_rect(response.rect);

        if self.pending_fit {
            if let Some(image_size) = self.image_size {
                self.viewport.fit_image(image_size, response.rect.size());
            }
            self.pending_fit = false;
        }

        // Input first, against last frame's hit index: drags and clicks then
        // render at their new position within the same frame.
        self.dispatch_input(ui, &response, session);

        painter.rect_filled(response.rect, 0.0, theme::canvas_background());
        self.draw_image(&painter);
        self.rebuild_index_and_draw(&painter, session, settings);
        self.draw_draft(&painter, session);
    }

    // ------------------------------------------------------------------
    // Input dispatch
    // ------------------------------------------------------------------

    fn dispatch_input(&mut self, ui: &mut Ui, response: &Response, session: &mut EditorSession) {
        let pointer = ui.input(|i| i.pointer.clone());
        let modifiers = ui.input(|i| i.modifiers);
        let hover = pointer.hover_pos().filter(|p| response.rect.contains(*p));
        self.hover_model = hover.map(|p| self.viewport.to_model(p));

        // Wheel / pinch zoom, anchored at the pointer.
        if let Some(anchor) = hover {
            let (scroll, pinch) = ui.input(|i| (i.scroll_delta.y, i.zoom_delta()));
            let factor = (scroll * 0.0015).exp() * pinch;
            if (factor - 1.0).abs() > 1e-4 {
                self.viewport.zoom_by(anchor, factor);
            }
        }

        // 1. Pan gesture — highest priority, exclusive with everything else
        // for the whole gesture.
        let pan_modifier =
            pointer.middle_down() || pointer.secondary_down() || modifiers.ctrl;
        if self.panning {
            if response.dragged() {
                self.viewport.pan_by(response.drag_delta());
            }
            if !pointer.any_down() {
                self.panning = false;
            }
            return;
        }
        if response.drag_started() && pan_modifier {
            self.panning = true;
            self.drag = None;
            return;
        }

        // 2. Active drawing mode — shapes are non-interactive here.
        if session.tools.tool().is_drawing() {
            if response.clicked()
                && !pan_modifier
                && let Some(pos) = pointer.interact_pos()
            {
                let model = self.viewport.to_model(pos);
                match session.tools.tool() {
                    Tool::DrawPolygon => session.tools.push_point(model),
                    Tool::DrawMarker => {
                        session.place_marker(model);
                    }
                    Tool::Select => {}
                }
            }
            return;
        }

        // 3. Shape drag (Select mode). Pointer-down on empty canvas clears
        // the selection.
        if response.drag_started() {
            if let Some(pos) = pointer.interact_pos() {
                match self.hit_at(pos) {
                    Some(id) => {
                        session.store.select(Some(id));
                        if let Some(item) = session.store.get(id) {
                            self.drag = Some(ShapeDrag {
                                id,
                                origin: item.points.clone(),
                                start: self.viewport.to_model(pos),
                            });
                        }
                    }
                    None => session.store.select(None),
                }
            }
            return;
        }
        if self.drag.is_some() {
            if response.dragged()
                && let Some(pos) = pointer.interact_pos()
            {
                let current = self.viewport.to_model(pos);
                if let Some(drag) = self.drag.as_ref() {
                    // The drag delta lives in model space, so the committed
                    // position is zoom-independent; vertices re-derive from
                    // the origin each motion instead of accumulating deltas.
                    let delta = Vec2::new(current.x - drag.start.x, current.y - drag.start.y);
                    let moved: Vec<Point> =
                        drag.origin.iter().map(|p| p.translated(delta)).collect();
                    session.store.set_points(drag.id, moved);
                }
            }
            if response.drag_released() {
                self.drag = None;
            }
            return;
        }

        // 4. Click selection: shape under the pointer, or clear on empty
        // canvas.
        if response.clicked()
            && let Some(pos) = pointer.interact_pos()
        {
            let hit = self.hit_at(pos);
            session.store.select(hit);
        }
    }

    /// Topmost rendered shape under a screen position, from the per-redraw
    /// index. Most recently drawn wins.
    fn hit_at(&self, pos: Pos2) -> Option<Uuid> {
        self.hit_index
            .iter()
            .rev()
            .find(|target| target.contains(pos))
            .map(|target| target.id)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn draw_image(&self, painter: &egui::Painter) {
        let (Some(texture), Some(size)) = (&self.texture, self.image_size) else {
            return;
        };
        let min = self.viewport.to_screen(Point::new(0.0, 0.0));
        let max = self.viewport.to_screen(Point::new(size.x, size.y));
        painter.image(
            texture.id(),
            Rect::from_min_max(min, max),
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
    }

    fn rebuild_index_and_draw(
        &mut self,
        painter: &egui::Painter,
        session: &EditorSession,
        settings: &AppSettings,
    ) {
        self.hit_index.clear();
        let interactive = !session.tools.tool().is_drawing();
        for item in session.store.items() {
            let selected = session.store.selected() == Some(item.id);
            let target = self.draw_item(painter, session, settings, item, selected);
            // Shapes stay visible but drop out of the hit index while a
            // drawing tool is active.
            if interactive {
                self.hit_index.push(target);
            }
        }
    }

    fn draw_item(
        &self,
        painter: &egui::Painter,
        session: &EditorSession,
        settings: &AppSettings,
        item: &DrawnItem,
        selected: bool,
    ) -> HitTarget {
        let unit = item.linked_unit.as_deref().and_then(|id| session.unit(id));
        let fill = theme::shape_fill(unit.map(|u| u.status), selected);
        let screen_points: Vec<Pos2> =
            item.points.iter().map(|p| self.viewport.to_screen(*p)).collect();

        let (label_center, label_width) = match item.kind {
            ItemKind::Marker => {
                let radius = item.radius.unwrap_or(crate::item::DEFAULT_MARKER_RADIUS)
                    * self.viewport.scale();
                painter.circle_filled(screen_points[0], radius, fill);
                if selected {
                    painter.circle_stroke(screen_points[0], radius, theme::selection_stroke());
                }
                (screen_points[0], radius * 1.8)
            }
            ItemKind::Polygon => {
                fill_polygon(painter, &screen_points, fill);
                if selected {
                    let mut outline = screen_points.clone();
                    if let Some(first) = outline.first().copied() {
                        outline.push(first);
                    }
                    painter.add(Shape::line(outline, theme::selection_stroke()));
                }
                let (min, max) = screen_bounds(&screen_points);
                (
                    Pos2::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5),
                    (max.x - min.x) * 0.85,
                )
            }
        };

        if settings.show_labels
            && let Some(unit) = unit
        {
            let label = settings.unit_label(unit);
            if !label.is_empty() {
                let font_size = fit_label_size(label.chars().count(), label_width);
                if font_size >= 6.0 {
                    painter.text(
                        label_center,
                        Align2::CENTER_CENTER,
                        label,
                        FontId::proportional(font_size),
                        theme::label_color(),
                    );
                }
            }
        }

        let screen_radius = item.radius.unwrap_or(0.0) * self.viewport.scale();
        HitTarget {
            id: item.id,
            kind: item.kind,
            screen_points,
            screen_radius,
        }
    }

    /// In-progress polygon feedback: handles on confirmed points, solid
    /// segments between them, dashed segment to the live pointer.
    fn draw_draft(&self, painter: &egui::Painter, session: &EditorSession) {
        if session.tools.tool() != Tool::DrawPolygon {
            return;
        }
        let draft = session.tools.draft();
        if draft.is_empty() {
            return;
        }
        let screen: Vec<Pos2> = draft.iter().map(|p| self.viewport.to_screen(*p)).collect();

        if screen.len() >= 2 {
            painter.add(Shape::line(screen.clone(), theme::draft_stroke()));
        }
        if let Some(hover) = self.hover_model {
            let last = screen[screen.len() - 1];
            let live = self.viewport.to_screen(hover);
            painter.extend(Shape::dashed_line(
                &[last, live],
                theme::draft_preview_stroke(),
                5.0,
                4.0,
            ));
        }
        for point in &screen {
            painter.circle_filled(*point, 3.5, theme::draft_handle_fill());
            painter.circle_stroke(*point, 3.5, theme::draft_stroke());
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Geometry helpers
// ============================================================================

pub(crate) fn screen_bounds(points: &[Pos2]) -> (Pos2, Pos2) {
    let mut min = Pos2::new(f32::MAX, f32::MAX);
    let mut max = Pos2::new(f32::MIN, f32::MIN);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

fn screen_point_in_polygon(pos: Pos2, vertices: &[Pos2]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > pos.y) != (b.y > pos.y) {
            let x_cross = (b.x - a.x) * (pos.y - a.y) / (b.y - a.y) + a.x;
            if pos.x <= x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Label size that fits `chars` characters into `available_width` pixels,
/// clamped to a readable range. Returns something below the draw threshold
/// for hopeless cases (tiny marker, very long label).
pub(crate) fn fit_label_size(chars: usize, available_width: f32) -> f32 {
    if available_width <= 0.0 {
        return 0.0;
    }
    // ~0.55em average advance for proportional text.
    let ideal = available_width / (chars.max(1) as f32 * 0.55);
    ideal.clamp(0.0, 16.0)
}

/// Fill an arbitrary simple polygon via ear clipping into a mesh. Handles
/// concave outlines; degenerate (zero-area) input draws nothing.
pub(crate) fn fill_polygon(painter: &egui::Painter, points: &[Pos2], color: Color32) {
    let triangles = triangulate(points);
    if triangles.is_empty() {
        return;
    }
    let mut mesh = egui::Mesh::default();
    for p in points {
        mesh.colored_vertex(*p, color);
    }
    for [a, b, c] in triangles {
        mesh.add_triangle(a as u32, b as u32, c as u32);
    }
    painter.add(Shape::mesh(mesh));
}

/// Ear-clipping triangulation of a simple polygon. Returns vertex-index
/// triples; empty for degenerate input.
fn triangulate(points: &[Pos2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    let area = signed_area(points);
    if area.abs() < 1e-6 {
        return Vec::new();
    }
    // Work on a CCW copy of the index list.
    let mut indices: Vec<usize> = if area > 0.0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };
    let mut triangles = Vec::with_capacity(n - 2);
    let mut guard = 0usize;
    while indices.len() > 3 && guard < n * n {
        guard += 1;
        let m = indices.len();
        let mut clipped = false;
        for i in 0..m {
            let prev = indices[(i + m - 1) % m];
            let curr = indices[i];
            let next = indices[(i + 1) % m];
            if is_ear(points, &indices, prev, curr, next) {
                triangles.push([prev, curr, next]);
                indices.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            // Self-intersecting or numerically hostile outline: fall back to
            // a triangle fan so the shape still renders.
            triangles.clear();
            for i in 1..n - 1 {
                triangles.push([0, i, i + 1]);
            }
            return triangles;
        }
    }
    if indices.len() == 3 {
        triangles.push([indices[0], indices[1], indices[2]]);
    }
    triangles
}

fn signed_area(points: &[Pos2]) -> f32 {
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn is_ear(points: &[Pos2], indices: &[usize], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (points[prev], points[curr], points[next]);
    // Convex corner in CCW orientation.
    if cross(a, b, c) <= 0.0 {
        return false;
    }
    // No remaining vertex may lie inside the candidate ear.
    for &idx in indices {
        if idx == prev || idx == curr || idx == next {
            continue;
        }
        let p = points[idx];
        if cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0 {
            return false;
        }
    }
    true
}
