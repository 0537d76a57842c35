use egui::{Pos2, Rect, Vec2};

use crate::item::Point;

/// Zoom bounds for the interactive editor.
pub const EDITOR_ZOOM_RANGE: (f32, f32) = (0.3, 4.0);
/// Zoom bounds for the read-only viewer (narrower by design, see DESIGN.md).
pub const VIEWER_ZOOM_RANGE: (f32, f32) = (0.3, 3.0);

/// Maps between plan-image pixels (model space) and screen pixels.
///
/// Two stacked transforms:
/// 1. the fit transform (`fit_scale`, `fit_offset`) — computed once per image
///    load, it centers the image in the canvas at zoom 1.0 preserving aspect;
/// 2. the view transform (`zoom`, `pan`) — mutated by user gestures.
///
/// A window resize updates `canvas_rect` only; zoom and pan survive it.
#[derive(Clone, Debug)]
pub struct Viewport {
    zoom: f32,
    pan: Vec2,
    min_zoom: f32,
    max_zoom: f32,
    fit_scale: f32,
    fit_offset: Vec2,
    canvas_rect: Rect,
}

impl Viewport {
    pub fn new(zoom_range: (f32, f32)) -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            min_zoom: zoom_range.0,
            max_zoom: zoom_range.1,
            fit_scale: 1.0,
            fit_offset: Vec2::ZERO,
            canvas_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(1.0, 1.0)),
        }
    }

    /// Recompute the fit transform for a freshly loaded image. Resets zoom
    /// and pan: a new image means a new framing.
    pub fn fit_image(&mut self, image_size: Vec2, canvas_size: Vec2) {
        let scale = if image_size.x <= 0.0 || image_size.y <= 0.0 {
            1.0
        } else {
            (canvas_size.x / image_size.x).min(canvas_size.y / image_size.y)
        };
        self.fit_scale = scale.max(f32::EPSILON);
        self.fit_offset = (canvas_size - image_size * self.fit_scale) * 0.5;
        self.reset_view();
    }

    /// Update the canvas rect after a window resize or layout pass. Zoom and
    /// pan are untouched.
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_rect
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Model-space pixels covered by one screen pixel times this factor;
    /// i.e. total model→screen scale.
    pub fn scale(&self) -> f32 {
        self.fit_scale * self.zoom
    }

    pub fn to_screen(&self, point: Point) -> Pos2 {
        let base = self.fit_offset + Vec2::new(point.x, point.y) * self.fit_scale;
        self.canvas_rect.min + self.pan + base * self.zoom
    }

    pub fn to_model(&self, screen: Pos2) -> Point {
        let base = (screen - self.canvas_rect.min - self.pan) / self.zoom;
        let model = (base - self.fit_offset) / self.fit_scale;
        Point::new(model.x, model.y)
    }

    /// Zoom to `new_zoom` (clamped) keeping the model point under `anchor`
    /// pinned to the same screen position.
    pub fn zoom_at(&mut self, anchor: Pos2, new_zoom: f32) {
        let old_zoom = self.zoom;
        self.zoom = new_zoom.clamp(self.min_zoom, self.max_zoom);
        if self.zoom == old_zoom {
            return;
        }
        // The unscaled-canvas point under the anchor must stay under it:
        //   anchor = rect.min + pan + base * zoom   (before and after)
        let base = (anchor - self.canvas_rect.min - self.pan) / old_zoom;
        self.pan = anchor - self.canvas_rect.min - base * self.zoom;
    }

    /// Multiply the current zoom by `factor`, anchored at `anchor`.
    pub fn zoom_by(&mut self, anchor: Pos2, factor: f32) {
        self.zoom_at(anchor, self.zoom * factor);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }

    /// Convert a screen-space distance to model units at the current scale.
    pub fn screen_to_model_distance(&self, screen_px: f32) -> f32 {
        screen_px / self.scale().max(f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(EDITOR_ZOOM_RANGE);
        vp.set_canvas_rect(Rect::from_min_size(
            Pos2::new(40.0, 20.0),
            Vec2::new(800.0, 600.0),
        ));
        vp.fit_image(Vec2::new(2000.0, 1000.0), Vec2::new(800.0, 600.0));
        vp
    }

    #[test]
    fn fit_centers_and_preserves_aspect() {
        let vp = viewport();
        // Width-constrained: 800 / 2000 = 0.4
        assert!((vp.scale() - 0.4).abs() < 1e-6);
        // Image center maps to canvas center.
        let center = vp.to_screen(Point::new(1000.0, 500.0));
        assert!((center.x - (40.0 + 400.0)).abs() < 1e-3);
        assert!((center.y - (20.0 + 300.0)).abs() < 1e-3);
    }

    #[test]
    fn round_trip_under_arbitrary_zoom_and_pan() {
        let mut vp = viewport();
        for &zoom in &[0.3, 0.75, 1.0, 2.5, 4.0] {
            vp.zoom_at(Pos2::new(150.0, 90.0), zoom);
            vp.pan_by(Vec2::new(-37.5, 12.25));
            for &(x, y) in &[(0.0, 0.0), (123.4, 567.8), (1999.0, 999.0)] {
                let p = Point::new(x, y);
                let back = vp.to_model(vp.to_screen(p));
                assert!(p.distance(back) < 1e-2, "round trip failed at zoom {zoom}");
            }
        }
    }

    #[test]
    fn zoom_at_keeps_anchor_pinned() {
        let mut vp = viewport();
        let anchor = Pos2::new(300.0, 200.0);
        let model_under_anchor = vp.to_model(anchor);
        vp.zoom_at(anchor, 2.0);
        let after = vp.to_screen(model_under_anchor);
        assert!((after - anchor).length() < 1e-2);
    }

    #[test]
    fn zoom_clamps_at_both_ends() {
        let mut vp = viewport();
        for _ in 0..50 {
            vp.zoom_by(Pos2::new(100.0, 100.0), 1.5);
        }
        assert_eq!(vp.zoom(), EDITOR_ZOOM_RANGE.1);
        for _ in 0..50 {
            vp.zoom_by(Pos2::new(100.0, 100.0), 0.5);
        }
        assert_eq!(vp.zoom(), EDITOR_ZOOM_RANGE.0);
    }

    #[test]
    fn resize_does_not_alter_zoom_or_pan() {
        let mut vp = viewport();
        vp.zoom_at(Pos2::new(200.0, 200.0), 1.7);
        vp.pan_by(Vec2::new(10.0, 10.0));
        let (zoom_before, pan_before) = (vp.zoom, vp.pan);
        vp.set_canvas_rect(Rect::from_min_size(Pos2::ZERO, Vec2::new(1200.0, 500.0)));
        assert_eq!(vp.zoom, zoom_before);
        assert_eq!(vp.pan, pan_before);
    }

    #[test]
    fn viewer_range_is_narrower() {
        let mut vp = Viewport::new(VIEWER_ZOOM_RANGE);
        vp.set_canvas_rect(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        for _ in 0..20 {
            vp.zoom_by(Pos2::new(10.0, 10.0), 2.0);
        }
        assert_eq!(vp.zoom(), VIEWER_ZOOM_RANGE.1);
    }
}
