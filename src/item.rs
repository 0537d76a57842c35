use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Radius applied when a persisted marker carries no explicit `raio` value.
pub const DEFAULT_MARKER_RADIUS: f32 = 15.0;

/// Allowed marker radius range, in plan-image pixels.
pub const MARKER_RADIUS_RANGE: std::ops::RangeInclusive<f32> = 5.0..=50.0;

/// A 2D point in plan-image pixels (origin top-left, unaffected by zoom/pan).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }

    pub fn from_pos2(pos: Pos2) -> Self {
        Self { x: pos.x, y: pos.y }
    }

    pub fn translated(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
        }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Persisted per-unit geometry, exactly as stored by the backend:
/// `{"points": [{"x", "y"}, ...], "raio": number?}`.
///
/// One point ⇒ circular marker (`raio` defaults to 15 when omitted).
/// Three or more points ⇒ polygon. Any other point count is malformed and
/// is neither rendered nor produced by the editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub points: Vec<Point>,
    #[serde(rename = "raio", skip_serializing_if = "Option::is_none", default)]
    pub radius: Option<f32>,
}

impl Geometry {
    pub fn marker(center: Point, radius: f32) -> Self {
        Self {
            points: vec![center],
            radius: Some(radius),
        }
    }

    pub fn polygon(points: Vec<Point>) -> Self {
        Self {
            points,
            radius: None,
        }
    }

    /// Shape kind encoded by the point count, or `None` for malformed data
    /// (0 or 2 points) that must not be rendered.
    pub fn kind(&self) -> Option<ItemKind> {
        match self.points.len() {
            1 => Some(ItemKind::Marker),
            n if n >= 3 => Some(ItemKind::Polygon),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Polygon,
    Marker,
}

/// An annotation drawn over the plan image, optionally linked to a unit.
///
/// Invariants: a polygon has ≥3 points and no radius; a marker has exactly
/// one point and a positive radius. Construction goes through `polygon` /
/// `marker` / `from_geometry` so malformed items never enter the store.
#[derive(Clone, Debug)]
pub struct DrawnItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub points: Vec<Point>,
    pub radius: Option<f32>,
    pub linked_unit: Option<String>,
}

impl DrawnItem {
    pub fn polygon(points: Vec<Point>) -> Self {
        debug_assert!(points.len() >= 3);
        Self {
            id: Uuid::new_v4(),
            kind: ItemKind::Polygon,
            points,
            radius: None,
            linked_unit: None,
        }
    }

    pub fn marker(center: Point, radius: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ItemKind::Marker,
            points: vec![center],
            radius: Some(radius),
            linked_unit: None,
        }
    }

    /// Rebuild an item from persisted geometry. Returns `None` for malformed
    /// geometry (0 or 2 points), which the editor refuses to load.
    pub fn from_geometry(unit_id: &str, geometry: &Geometry) -> Option<Self> {
        let kind = geometry.kind()?;
        let radius = match kind {
            ItemKind::Marker => Some(geometry.radius.unwrap_or(DEFAULT_MARKER_RADIUS)),
            ItemKind::Polygon => None,
        };
        Some(Self {
            id: Uuid::new_v4(),
            kind,
            points: geometry.points.clone(),
            radius,
            linked_unit: Some(unit_id.to_string()),
        })
    }

    /// The persistable form of this item's shape.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            points: self.points.clone(),
            radius: self.radius,
        }
    }

    /// Arithmetic mean of the vertices. For markers this is the center.
    pub fn centroid(&self) -> Point {
        let n = self.points.len().max(1) as f32;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }

    /// Translate every vertex by `delta`, in plan-image pixels.
    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p = p.translated(delta);
        }
    }

    /// Hit test in plan-image pixels: point-in-polygon for polygons,
    /// distance-from-center ≤ radius for markers.
    pub fn contains(&self, point: Point) -> bool {
        match self.kind {
            ItemKind::Marker => {
                let radius = self.radius.unwrap_or(DEFAULT_MARKER_RADIUS);
                self.points[0].distance(point) <= radius
            }
            ItemKind::Polygon => point_in_polygon(point, &self.points),
        }
    }

    /// Axis-aligned bounding box (min, max) of the shape, radius included.
    pub fn bounds(&self) -> (Point, Point) {
        let mut min = Point::new(f32::MAX, f32::MAX);
        let mut max = Point::new(f32::MIN, f32::MIN);
        for p in &self.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if let Some(r) = self.radius {
            min.x -= r;
            min.y -= r;
            max.x += r;
            max.y += r;
        }
        (min, max)
    }
}

/// Even-odd ray-casting test. Points exactly on an edge count as inside,
/// which is the forgiving behavior wanted for click selection.
fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x <= x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn polygon_hit_test_inside_and_outside() {
        let item = DrawnItem::polygon(square());
        assert!(item.contains(Point::new(5.0, 5.0)));
        assert!(!item.contains(Point::new(15.0, 5.0)));
        assert!(!item.contains(Point::new(5.0, -1.0)));
    }

    #[test]
    fn concave_polygon_hit_test() {
        // L-shape: the notch at the top-right must not register as a hit.
        let item = DrawnItem::polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(8.0, 4.0),
            Point::new(8.0, 8.0),
            Point::new(0.0, 8.0),
        ]);
        assert!(item.contains(Point::new(2.0, 2.0)));
        assert!(item.contains(Point::new(6.0, 6.0)));
        assert!(!item.contains(Point::new(6.0, 2.0)));
    }

    #[test]
    fn marker_hit_test_uses_radius() {
        let item = DrawnItem::marker(Point::new(10.0, 10.0), 15.0);
        assert!(item.contains(Point::new(10.0, 10.0)));
        assert!(item.contains(Point::new(24.9, 10.0)));
        assert!(!item.contains(Point::new(25.1, 10.0)));
    }

    #[test]
    fn translate_moves_every_vertex() {
        let mut item = DrawnItem::polygon(square());
        item.translate(Vec2::new(5.0, -2.0));
        assert_eq!(item.points[0], Point::new(5.0, -2.0));
        assert_eq!(item.points[2], Point::new(15.0, 8.0));
    }

    #[test]
    fn centroid_of_square() {
        let item = DrawnItem::polygon(square());
        assert_eq!(item.centroid(), Point::new(5.0, 5.0));
    }

    #[test]
    fn geometry_kind_classification() {
        assert_eq!(
            Geometry::marker(Point::new(1.0, 1.0), 10.0).kind(),
            Some(ItemKind::Marker)
        );
        assert_eq!(Geometry::polygon(square()).kind(), Some(ItemKind::Polygon));
        assert_eq!(Geometry { points: vec![], radius: None }.kind(), None);
        assert_eq!(
            Geometry {
                points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
                radius: None
            }
            .kind(),
            None
        );
    }

    #[test]
    fn malformed_geometry_is_rejected_on_load() {
        let two_points = Geometry {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            radius: None,
        };
        assert!(DrawnItem::from_geometry("u1", &two_points).is_none());
    }

    #[test]
    fn marker_radius_defaults_when_raio_missing() {
        let geometry: Geometry = serde_json::from_str(r#"{"points":[{"x":3.0,"y":4.0}]}"#)
            .expect("geometry parses");
        let item = DrawnItem::from_geometry("u1", &geometry).expect("marker item");
        assert_eq!(item.radius, Some(DEFAULT_MARKER_RADIUS));
    }

    #[test]
    fn geometry_serializes_with_raio_field() {
        let json = serde_json::to_string(&Geometry::marker(Point::new(1.0, 2.0), 20.0))
            .expect("serialize");
        assert!(json.contains("\"raio\":20.0"));

        let json = serde_json::to_string(&Geometry::polygon(square())).expect("serialize");
        assert!(!json.contains("raio"));
    }
}
