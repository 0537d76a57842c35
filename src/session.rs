//! One editing session over one plan: units, shape store, tool state,
//! auto-link, and the diff baseline, behind explicit transition methods.
//! Everything here is driveable without a rendering surface.

use egui::Vec2;
use uuid::Uuid;

use crate::components::tools::{FinishError, Tool, ToolState};
use crate::io::{BackendError, Unit, UnitRepository};
use crate::item::{DrawnItem, Point};
use crate::ops::autolink::AutoLink;
use crate::ops::diff::{self, DiffPlan, Snapshot};
use crate::store::{ClearFilter, PlanStore};

pub struct EditorSession {
    pub map_id: String,
    pub units: Vec<Unit>,
    pub store: PlanStore,
    pub tools: ToolState,
    pub autolink: AutoLink,
    snapshot: Snapshot,
    /// Last user-facing message (validation errors, auto-link notices).
    status: Option<String>,
}

impl EditorSession {
    /// Mount a session: read the unit list, rebuild shapes from persisted
    /// geometry, and capture the diff baseline.
    pub fn load(repo: &dyn UnitRepository, map_id: &str) -> Result<Self, BackendError> {
        let units = repo.units_for_map(map_id)?;
        let store = PlanStore::from_units(
            units
                .iter()
                .filter_map(|u| u.geometry.as_ref().map(|g| (u.id.as_str(), g))),
        );
        let snapshot = Snapshot::capture(&store);
        Ok(Self {
            map_id: map_id.to_string(),
            units,
            store,
            tools: ToolState::new(),
            autolink: AutoLink::new(),
            snapshot,
            status: None,
        })
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    /// Block names present on this plan, deduplicated, sorted.
    pub fn blocks(&self) -> Vec<String> {
        let mut blocks: Vec<String> = self.units.iter().map(|u| u.block.clone()).collect();
        blocks.sort();
        blocks.dedup();
        blocks
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // ------------------------------------------------------------------
    // Shape creation
    // ------------------------------------------------------------------

    /// Finish the in-progress polygon draft into a stored shape. On
    /// rejection the draft and tool are untouched and the error text is
    /// surfaced as the status message.
    pub fn finish_polygon(&mut self) -> Result<Uuid, FinishError> {
        match self.tools.finish_polygon() {
            Ok(points) => Ok(self.insert_new(DrawnItem::polygon(points))),
            Err(e) => {
                self.status = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Place a marker at `center` with the configured radius.
    pub fn place_marker(&mut self, center: Point) -> Uuid {
        let radius = self.tools.marker_radius();
        self.insert_new(DrawnItem::marker(center, radius))
    }

    /// Add a freshly drawn shape, assigning the auto-link queue head when
    /// auto-link is active. An empty queue is not an error: the shape stays
    /// unlinked and the status line says the block is fully linked.
    fn insert_new(&mut self, item: DrawnItem) -> Uuid {
        let next_unit = self
            .autolink
            .peek_next(&self.units, &self.store)
            .map(|u| (u.id.clone(), u.code.clone()));
        let id = self.store.add(item);
        match next_unit {
            Some((unit_id, code)) => {
                self.store.link(id, &unit_id);
                self.status = Some(format!("linked to unit {}", code));
            }
            None => {
                if let Some(block) = self.autolink.group() {
                    self.status = Some(format!("all units of block {} are linked", block));
                }
            }
        }
        id
    }

    // ------------------------------------------------------------------
    // Selection operations
    // ------------------------------------------------------------------

    pub fn delete_selected(&mut self) -> bool {
        match self.store.selected() {
            Some(id) => self.store.remove(id),
            None => false,
        }
    }

    /// Duplicate the selected shape, offset by `offset` in model units
    /// (the caller converts the fixed screen-space delta at current scale).
    pub fn duplicate_selected(&mut self, offset: Vec2) -> Option<Uuid> {
        let id = self.store.selected()?;
        let copy = self.store.duplicate(id, offset)?;
        self.store.select(Some(copy));
        Some(copy)
    }

    pub fn link_selected(&mut self, unit_id: &str) -> bool {
        match self.store.selected() {
            Some(id) => self.store.link(id, unit_id),
            None => false,
        }
    }

    pub fn unlink_selected(&mut self) -> bool {
        match self.store.selected() {
            Some(id) => self.store.unlink(id),
            None => false,
        }
    }

    pub fn clear_shapes(&mut self, filter: ClearFilter) -> usize {
        self.store.clear(filter)
    }

    /// Keyboard gate: Delete/Backspace and the duplicate chord only apply
    /// with an active Select-mode selection.
    pub fn selection_hotkeys_active(&self) -> bool {
        self.tools.tool() == Tool::Select && self.store.selected().is_some()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// True when an unsaved edit exists (the diff plan is non-empty).
    pub fn is_dirty(&self) -> bool {
        !self.diff_plan().is_empty()
    }

    pub fn diff_plan(&self) -> DiffPlan {
        diff::compute(&self.snapshot, &self.store)
    }

    /// Re-baseline after a fully successful save.
    pub fn mark_saved(&mut self) {
        self.snapshot = Snapshot::capture(&self.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::*;
    use crate::io::InMemoryBackend;

    fn session_with_block() -> EditorSession {
        let backend = InMemoryBackend::new(vec![
            unit("u1", "101", "T1", Some(1)),
            unit("u2", "102", "T1", Some(1)),
            unit("u3", "201", "T2", Some(2)),
        ]);
        EditorSession::load(&backend, "map-1").expect("session loads")
    }

    #[test]
    fn mount_rebuilds_items_and_baseline_from_geometry() {
        let backend = InMemoryBackend::new(vec![
            unit_with_geometry("u1", "101", marker_geometry(10.0, 10.0, 15.0)),
            unit("u2", "102", "A", Some(1)),
        ]);
        let session = EditorSession::load(&backend, "map-1").expect("session loads");
        assert_eq!(session.store.len(), 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn drawing_consumes_the_autolink_queue_in_order() {
        let mut session = session_with_block();
        session.autolink.enable("T1");

        let first = session.place_marker(Point::new(10.0, 10.0));
        assert_eq!(
            session.store.get(first).unwrap().linked_unit.as_deref(),
            Some("u1")
        );

        session.tools.set_tool(Tool::DrawPolygon);
        session.tools.push_point(Point::new(0.0, 0.0));
        session.tools.push_point(Point::new(10.0, 0.0));
        session.tools.push_point(Point::new(10.0, 10.0));
        let second = session.finish_polygon().expect("finishes");
        assert_eq!(
            session.store.get(second).unwrap().linked_unit.as_deref(),
            Some("u2")
        );

        // Queue exhausted: the next shape stays unlinked with a notice.
        let third = session.place_marker(Point::new(30.0, 30.0));
        assert_eq!(session.store.get(third).unwrap().linked_unit, None);
        assert!(
            session
                .status_message()
                .is_some_and(|m| m.contains("all units"))
        );
    }

    #[test]
    fn rejected_finish_surfaces_message_and_keeps_draft() {
        let mut session = session_with_block();
        session.tools.set_tool(Tool::DrawPolygon);
        session.tools.push_point(Point::new(0.0, 0.0));
        session.tools.push_point(Point::new(10.0, 0.0));

        assert!(session.finish_polygon().is_err());
        assert_eq!(session.tools.draft().len(), 2);
        assert_eq!(session.store.len(), 0);
        assert!(
            session
                .status_message()
                .is_some_and(|m| m.contains("at least 3"))
        );
    }

    #[test]
    fn disabling_autolink_does_not_retroact() {
        let mut session = session_with_block();
        session.autolink.enable("T1");
        let id = session.place_marker(Point::new(5.0, 5.0));
        session.autolink.disable();
        assert_eq!(
            session.store.get(id).unwrap().linked_unit.as_deref(),
            Some("u1")
        );
        // New shapes are simply unlinked now.
        let id2 = session.place_marker(Point::new(25.0, 5.0));
        assert_eq!(session.store.get(id2).unwrap().linked_unit, None);
    }

    #[test]
    fn dirty_tracks_the_diff_plan() {
        let mut session = session_with_block();
        assert!(!session.is_dirty());
        let id = session.place_marker(Point::new(5.0, 5.0));
        session.store.link(id, "u1");
        assert!(session.is_dirty());
        session.mark_saved();
        assert!(!session.is_dirty());
    }

    #[test]
    fn blocks_are_deduplicated_and_sorted() {
        let session = session_with_block();
        assert_eq!(session.blocks(), vec!["T1".to_string(), "T2".to_string()]);
    }
}
