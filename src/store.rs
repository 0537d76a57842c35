use egui::Vec2;
use uuid::Uuid;

use crate::item::{DrawnItem, ItemKind, Point, MARKER_RADIUS_RANGE};

/// Which shapes a bulk clear removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearFilter {
    All,
    MarkersOnly,
    PolygonsOnly,
}

/// Screen-space offset applied to duplicated shapes, converted to model
/// units at the current scale by the caller.
pub const DUPLICATE_OFFSET_PX: f32 = 14.0;

/// Ordered collection of drawn shapes plus the single-item selection.
///
/// Items are kept in draw order; the last item is topmost for hit testing.
/// At most one item may reference a given unit — `link` enforces this by
/// stealing the link from any previous holder.
#[derive(Default)]
pub struct PlanStore {
    items: Vec<DrawnItem>,
    selected: Option<Uuid>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from persisted unit geometry. Malformed geometry
    /// (wrong point count) is skipped, matching the viewer's behavior.
    pub fn from_units<'a>(units: impl Iterator<Item = (&'a str, &'a crate::item::Geometry)>) -> Self {
        let items = units
            .filter_map(|(unit_id, geometry)| DrawnItem::from_geometry(unit_id, geometry))
            .collect();
        Self {
            items,
            selected: None,
        }
    }

    pub fn items(&self) -> &[DrawnItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&DrawnItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut DrawnItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn add(&mut self, item: DrawnItem) -> Uuid {
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Remove a shape. Clears the selection if it pointed at the shape.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.items.len() != before
    }

    pub fn clear(&mut self, filter: ClearFilter) -> usize {
        let keep = |item: &DrawnItem| match filter {
            ClearFilter::All => false,
            ClearFilter::MarkersOnly => item.kind != ItemKind::Marker,
            ClearFilter::PolygonsOnly => item.kind != ItemKind::Polygon,
        };
        let before = self.items.len();
        self.items.retain(keep);
        if let Some(sel) = self.selected
            && self.get(sel).is_none()
        {
            self.selected = None;
        }
        before - self.items.len()
    }

    /// Copy a shape, offset by `offset` (model units), with its unit link
    /// dropped — a duplicate is never auto-linked to the source's unit.
    pub fn duplicate(&mut self, id: Uuid, offset: Vec2) -> Option<Uuid> {
        let source = self.get(id)?;
        let mut copy = source.clone();
        copy.id = Uuid::new_v4();
        copy.linked_unit = None;
        copy.translate(offset);
        Some(self.add(copy))
    }

    pub fn translate(&mut self, id: Uuid, delta: Vec2) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.translate(delta);
                true
            }
            None => false,
        }
    }

    /// Replace a shape's vertices wholesale (drag-in-progress updates).
    /// The point count must match the existing shape; mismatches are
    /// rejected so a marker can never become a pseudo-polygon.
    pub fn set_points(&mut self, id: Uuid, points: Vec<Point>) -> bool {
        match self.get_mut(id) {
            Some(item) if item.points.len() == points.len() => {
                item.points = points;
                true
            }
            _ => false,
        }
    }

    /// Set a marker's radius, clamped to the allowed range. No-op on
    /// polygons.
    pub fn set_marker_radius(&mut self, id: Uuid, radius: f32) -> bool {
        match self.get_mut(id) {
            Some(item) if item.kind == ItemKind::Marker => {
                item.radius =
                    Some(radius.clamp(*MARKER_RADIUS_RANGE.start(), *MARKER_RADIUS_RANGE.end()));
                true
            }
            _ => false,
        }
    }

    /// Link a shape to a unit. Any other shape holding that unit loses the
    /// link — a unit is referenced by at most one shape at a time.
    pub fn link(&mut self, id: Uuid, unit_id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        for item in &mut self.items {
            if item.linked_unit.as_deref() == Some(unit_id) {
                item.linked_unit = None;
            }
        }
        if let Some(item) = self.get_mut(id) {
            item.linked_unit = Some(unit_id.to_string());
        }
        true
    }

    pub fn unlink(&mut self, id: Uuid) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.linked_unit = None;
                true
            }
            None => false,
        }
    }

    pub fn is_unit_linked(&self, unit_id: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.linked_unit.as_deref() == Some(unit_id))
    }

    pub fn item_for_unit(&self, unit_id: &str) -> Option<&DrawnItem> {
        self.items
            .iter()
            .find(|item| item.linked_unit.as_deref() == Some(unit_id))
    }

    pub fn linked_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.linked_unit.is_some())
            .count()
    }

    /// Topmost shape under `point`, most recently drawn wins on overlap.
    pub fn hit_test(&self, point: Point) -> Option<Uuid> {
        self.items
            .iter()
            .rev()
            .find(|item| item.contains(point))
            .map(|item| item.id)
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&DrawnItem> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: Option<Uuid>) {
        self.selected = id.filter(|id| self.get(*id).is_some());
    }
}
