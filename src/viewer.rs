//! Read-only plan viewer: pan/zoom over the persisted map plus one
//! interaction — click a shape to inspect its unit. No shape store, no
//! diff engine, no mutation path; it loads the image and geometry through
//! the same backend traits the editor uses, sharing no in-memory state
//! with it.

use eframe::egui;
use egui::{Align2, Color32, FontId, Grid, Pos2, Rect, Sense, Shape, TextureHandle, Ui, Vec2};

use crate::canvas::{fill_polygon, fit_label_size, screen_bounds};
use crate::io::{BackendError, Unit, UnitRepository};
use crate::item::{DrawnItem, ItemKind, Point};
use crate::settings::AppSettings;
use crate::theme;
use crate::viewport::{Viewport, VIEWER_ZOOM_RANGE};

pub struct ViewerPanel {
    pub map_id: String,
    pub viewport: Viewport,
    units: Vec<Unit>,
    items: Vec<DrawnItem>,
    texture: Option<TextureHandle>,
    image_size: Option<Vec2>,
    pending_fit: bool,
    panning: bool,
    /// Unit currently shown in the detail window.
    detail: Option<String>,
}

impl ViewerPanel {
    /// Load the viewer's own copy of the unit geometry. Malformed geometry
    /// (wrong point count) is simply not rendered.
    pub fn load(repo: &dyn UnitRepository, map_id: &str) -> Result<Self, BackendError> {
        let units = repo.units_for_map(map_id)?;
        let items = units
            .iter()
            .filter_map(|unit| {
                unit.geometry
                    .as_ref()
                    .and_then(|g| DrawnItem::from_geometry(&unit.id, g))
            })
            .collect();
        Ok(Self {
            map_id: map_id.to_string(),
            viewport: Viewport::new(VIEWER_ZOOM_RANGE),
            units,
            items,
            texture: None,
            image_size: None,
            pending_fit: false,
            panning: false,
            detail: None,
        })
    }

    pub fn set_image(&mut self, texture: TextureHandle, pixel_size: Vec2) {
        self.texture = Some(texture);
        self.image_size = Some(pixel_size);
        self.pending_fit = true;
    }

    pub fn shape_count(&self) -> usize {
        self.items.len()
    }

    fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn show(&mut self, ui: &mut Ui, settings: &AppSettings) {
        let available = ui.available_size();
        let size = Vec2::new(available.x, available.y.max(crate::canvas::MIN_CANVAS_HEIGHT));
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        self.viewport.set_canvas_rect(response.rect);

        if self.pending_fit {
            if let Some(image_size) = self.image_size {
                self.viewport.fit_image(image_size, response.rect.size());
            }
            self.pending_fit = false;
        }

        self.handle_input(ui, &response);

        painter.rect_filled(response.rect, 0.0, theme::canvas_background());
        if let (Some(texture), Some(image_size)) = (&self.texture, self.image_size) {
            let min = self.viewport.to_screen(Point::new(0.0, 0.0));
            let max = self.viewport.to_screen(Point::new(image_size.x, image_size.y));
            painter.image(
                texture.id(),
                Rect::from_min_max(min, max),
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        self.draw_items(&painter, settings);
        self.show_detail_window(ui);
    }

    fn handle_input(&mut self, ui: &mut Ui, response: &egui::Response) {
        let pointer = ui.input(|i| i.pointer.clone());
        let hover = pointer
            .hover_pos()
            .filter(|p| response.rect.contains(*p));

        if let Some(anchor) = hover {
            let (scroll, pinch) = ui.input(|i| (i.scroll_delta.y, i.zoom_delta()));
            let factor = (scroll * 0.0015).exp() * pinch;
            if (factor - 1.0).abs() > 1e-4 {
                self.viewport.zoom_by(anchor, factor);
            }
        }

        // Any drag pans; there is nothing else to drag here.
        if response.drag_started() {
            self.panning = true;
        }
        if self.panning {
            if response.dragged() {
                self.viewport.pan_by(response.drag_delta());
            }
            if !pointer.any_down() {
                self.panning = false;
            }
            return;
        }

        if response.clicked()
            && let Some(pos) = pointer.interact_pos()
        {
            let model = self.viewport.to_model(pos);
            self.detail = self
                .items
                .iter()
                .rev()
                .find(|item| item.contains(model))
                .and_then(|item| item.linked_unit.clone());
        }
    }

    fn draw_items(&self, painter: &egui::Painter, settings: &AppSettings) {
        for item in &self.items {
            let unit = item.linked_unit.as_deref().and_then(|id| self.unit(id));
            let inspected = item.linked_unit == self.detail && self.detail.is_some();
            let fill = theme::shape_fill(unit.map(|u| u.status), inspected);
            let screen: Vec<Pos2> = item
                .points
                .iter()
                .map(|p| self.viewport.to_screen(*p))
                .collect();

            let (center, label_width) = match item.kind {
                ItemKind::Marker => {
                    let radius = item.radius.unwrap_or(crate::item::DEFAULT_MARKER_RADIUS)
                        * self.viewport.scale();
                    painter.circle_filled(screen[0], radius, fill);
                    if inspected {
                        painter.circle_stroke(screen[0], radius, theme::selection_stroke());
                    }
                    (screen[0], radius * 1.8)
                }
                ItemKind::Polygon => {
                    fill_polygon(painter, &screen, fill);
                    if inspected {
                        let mut outline = screen.clone();
                        if let Some(first) = outline.first().copied() {
                            outline.push(first);
                        }
                        painter.add(Shape::line(outline, theme::selection_stroke()));
                    }
                    let (min, max) = screen_bounds(&screen);
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
                            center,
                            Align2::CENTER_CENTER,
                            label,
                            FontId::proportional(font_size),
                            theme::label_color(),
                        );
                    }
                }
            }
        }
    }

    /// Read-only detail card for the clicked unit.
    fn show_detail_window(&mut self, ui: &mut Ui) {
        let Some(unit) = self.detail.as_ref().and_then(|id| self.unit(id)).cloned() else {
            return;
        };
        let mut open = true;
        egui::Window::new(format!("Unit {}", unit.code))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ui.ctx(), |ui| {
                Grid::new("unit_detail").num_columns(2).show(ui, |ui| {
                    ui.label("Status");
                    ui.colored_label(theme::status_color(unit.status), unit.status.label());
                    ui.end_row();
                    ui.label("Block");
                    ui.label(&unit.block);
                    ui.end_row();
                    ui.label("Typology");
                    ui.label(&unit.typology);
                    ui.end_row();
                    ui.label("Area");
                    ui.label(format!("{:.1} m²", unit.area_m2));
                    ui.end_row();
                    ui.label("Price");
                    ui.label(format!("$ {:.2}", unit.price));
                    ui.end_row();
                    ui.label("Notes");
                    ui.label(if unit.notes.is_empty() {
                        "—"
                    } else {
                        unit.notes.as_str()
                    });
                    ui.end_row();
                });
            });
        if !open {
            self.detail = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::*;
    use crate::io::InMemoryBackend;
    use crate::item::Geometry;

    #[test]
    fn viewer_loads_only_well_formed_geometry() {
        let two_points = Geometry {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            radius: None,
        };
        let backend = InMemoryBackend::new(vec![
            unit_with_geometry("u1", "101", marker_geometry(10.0, 10.0, 15.0)),
            unit_with_geometry("u2", "102", two_points),
            unit("u3", "103", "A", Some(1)),
        ]);
        let viewer = ViewerPanel::load(&backend, "map-1").expect("viewer loads");
        assert_eq!(viewer.shape_count(), 1);
    }

    #[test]
    fn viewer_state_is_independent_of_the_editor() {
        let backend = InMemoryBackend::new(vec![unit_with_geometry(
            "u1",
            "101",
            marker_geometry(10.0, 10.0, 15.0),
        )]);
        let viewer = ViewerPanel::load(&backend, "map-1").expect("viewer loads");

        // Mutating the backend after load does not change the viewer copy.
        backend
            .clear_geometry(&["u1".to_string()])
            .expect("clear succeeds");
        assert_eq!(viewer.shape_count(), 1);

        let reloaded = ViewerPanel::load(&backend, "map-1").expect("viewer reloads");
        assert_eq!(reloaded.shape_count(), 0);
    }
}
