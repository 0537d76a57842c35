//! Drawing tool state machine and the tool strip UI.
//!
//! Three modes: Select, DrawPolygon, DrawMarker. Transitions happen only
//! through `set_tool` — never implicitly — and leaving DrawPolygon discards
//! any unfinished point sequence.

use egui::{Color32, RichText, Ui};

use crate::item::{Point, MARKER_RADIUS_RANGE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    DrawPolygon,
    DrawMarker,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::DrawPolygon => "Polygon",
            Tool::DrawMarker => "Marker",
        }
    }

    /// Hit-testing and shape manipulation are suspended while drawing.
    pub fn is_drawing(&self) -> bool {
        matches!(self, Tool::DrawPolygon | Tool::DrawMarker)
    }
}

/// Rejection reasons for finish-polygon. Carried to the status line as a
/// user-facing message; the draft is left untouched so the operator can keep
/// adding points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishError {
    TooFewPoints(usize),
}

impl std::fmt::Display for FinishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishError::TooFewPoints(n) => {
                write!(f, "a polygon needs at least 3 points (got {})", n)
            }
        }
    }
}

/// Tool mode plus the in-progress polygon draft and the marker radius
/// setting. Pure state: no rendering surface needed to drive or test it.
#[derive(Clone, Debug)]
pub struct ToolState {
    tool: Tool,
    draft: Vec<Point>,
    marker_radius: f32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            draft: Vec::new(),
            marker_radius: crate::item::DEFAULT_MARKER_RADIUS,
        }
    }
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. Leaving DrawPolygon throws away the unfinished draft.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == Tool::DrawPolygon && tool != Tool::DrawPolygon {
            self.draft.clear();
        }
        self.tool = tool;
    }

    pub fn draft(&self) -> &[Point] {
        &self.draft
    }

    pub fn has_draft(&self) -> bool {
        !self.draft.is_empty()
    }

    /// Confirm one polygon vertex at the clicked position. Only meaningful
    /// in DrawPolygon mode; ignored otherwise.
    pub fn push_point(&mut self, point: Point) {
        if self.tool == Tool::DrawPolygon {
            self.draft.push(point);
        }
    }

    /// Drop the last confirmed vertex. Inert when the draft is empty.
    pub fn undo_point(&mut self) -> bool {
        self.draft.pop().is_some()
    }

    /// Complete the draft into a polygon's vertex list. Fails without
    /// touching any state when fewer than 3 points are confirmed.
    pub fn finish_polygon(&mut self) -> Result<Vec<Point>, FinishError> {
        if self.draft.len() < 3 {
            return Err(FinishError::TooFewPoints(self.draft.len()));
        }
        Ok(std::mem::take(&mut self.draft))
    }

    pub fn marker_radius(&self) -> f32 {
        self.marker_radius
    }

    pub fn set_marker_radius(&mut self, radius: f32) {
        self.marker_radius =
            radius.clamp(*MARKER_RADIUS_RANGE.start(), *MARKER_RADIUS_RANGE.end());
    }
}

/// Actions the tool strip requests from the session. Collected per frame and
/// applied by the caller, so the UI stays free of session borrows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolAction {
    FinishPolygon,
    UndoPoint,
    DeleteSelected,
    DuplicateSelected,
    /// Resize the selected marker in place.
    SetSelectedRadius(f32),
}

/// Left-hand tool strip: tool buttons, marker radius, polygon draft actions.
pub struct ToolsPanel;

impl ToolsPanel {
    pub fn show(
        ui: &mut Ui,
        tools: &mut ToolState,
        has_selection: bool,
        selected_marker_radius: Option<f32>,
        actions: &mut Vec<ToolAction>,
    ) {
        ui.add_space(4.0);
        ui.label(RichText::new("Tools").size(11.0).color(Color32::GRAY));

        for tool in [Tool::Select, Tool::DrawPolygon, Tool::DrawMarker] {
            let active = tools.tool() == tool;
            if ui.selectable_label(active, tool.label()).clicked() && !active {
                tools.set_tool(tool);
            }
        }

        ui.separator();

        match tools.tool() {
            Tool::DrawPolygon => {
                ui.label(
                    RichText::new(format!("{} point(s)", tools.draft().len()))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                if ui
                    .add_enabled(tools.draft().len() >= 3, egui::Button::new("Finish"))
                    .clicked()
                {
                    actions.push(ToolAction::FinishPolygon);
                }
                if ui
                    .add_enabled(tools.has_draft(), egui::Button::new("Undo point"))
                    .clicked()
                {
                    actions.push(ToolAction::UndoPoint);
                }
            }
            Tool::DrawMarker => {
                let mut radius = tools.marker_radius();
                ui.label(RichText::new("Radius").size(11.0).color(Color32::GRAY));
                if ui
                    .add(egui::Slider::new(&mut radius, MARKER_RADIUS_RANGE).suffix(" px"))
                    .changed()
                {
                    tools.set_marker_radius(radius);
                }
            }
            Tool::Select => {
                if ui
                    .add_enabled(has_selection, egui::Button::new("Duplicate"))
                    .clicked()
                {
                    actions.push(ToolAction::DuplicateSelected);
                }
                if ui
                    .add_enabled(has_selection, egui::Button::new("Delete"))
                    .clicked()
                {
                    actions.push(ToolAction::DeleteSelected);
                }
                // In-place radius edit when the selection is a marker.
                if let Some(current) = selected_marker_radius {
                    let mut radius = current;
                    ui.label(RichText::new("Radius").size(11.0).color(Color32::GRAY));
                    if ui
                        .add(egui::Slider::new(&mut radius, MARKER_RADIUS_RANGE).suffix(" px"))
                        .changed()
                    {
                        actions.push(ToolAction::SetSelectedRadius(radius));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn leaving_draw_polygon_discards_draft() {
        let mut tools = ToolState::new();
        tools.set_tool(Tool::DrawPolygon);
        tools.push_point(p(0.0, 0.0));
        tools.push_point(p(1.0, 0.0));
        assert_eq!(tools.draft().len(), 2);

        tools.set_tool(Tool::Select);
        assert!(!tools.has_draft());

        // Re-entering starts from scratch.
        tools.set_tool(Tool::DrawPolygon);
        assert_eq!(tools.draft().len(), 0);
    }

    #[test]
    fn points_only_append_in_draw_polygon_mode() {
        let mut tools = ToolState::new();
        tools.push_point(p(0.0, 0.0));
        assert!(!tools.has_draft());

        tools.set_tool(Tool::DrawMarker);
        tools.push_point(p(0.0, 0.0));
        assert!(!tools.has_draft());
    }

    #[test]
    fn finish_rejects_under_three_points_without_mutation() {
        let mut tools = ToolState::new();
        tools.set_tool(Tool::DrawPolygon);
        for count in 0..3 {
            let result = tools.finish_polygon();
            assert_eq!(result, Err(FinishError::TooFewPoints(count)));
            assert_eq!(tools.draft().len(), count);
            assert_eq!(tools.tool(), Tool::DrawPolygon);
            tools.push_point(p(count as f32, 0.0));
        }
    }

    #[test]
    fn finish_succeeds_with_three_points_even_collinear() {
        let mut tools = ToolState::new();
        tools.set_tool(Tool::DrawPolygon);
        tools.push_point(p(0.0, 0.0));
        tools.push_point(p(5.0, 0.0));
        tools.push_point(p(10.0, 0.0));

        let points = tools.finish_polygon().expect("3 points finish");
        assert_eq!(points.len(), 3);
        assert!(!tools.has_draft());
        assert_eq!(tools.tool(), Tool::DrawPolygon);
    }

    #[test]
    fn undo_point_is_inert_on_empty_draft() {
        let mut tools = ToolState::new();
        tools.set_tool(Tool::DrawPolygon);
        assert!(!tools.undo_point());

        tools.push_point(p(0.0, 0.0));
        assert!(tools.undo_point());
        assert!(!tools.undo_point());
    }

    #[test]
    fn marker_radius_clamps_to_range() {
        let mut tools = ToolState::new();
        tools.set_marker_radius(2.0);
        assert_eq!(tools.marker_radius(), 5.0);
        tools.set_marker_radius(80.0);
        assert_eq!(tools.marker_radius(), 50.0);
        tools.set_marker_radius(23.0);
        assert_eq!(tools.marker_radius(), 23.0);
    }
}
