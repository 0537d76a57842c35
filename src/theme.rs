//! Shape paint styles. The status→color mapping mirrors the host
//! application's legend and is fixed here; everything else derives from it.

use egui::{Color32, Stroke};

use crate::io::UnitStatus;

/// Alpha for shapes that are not selected — the plan must stay readable
/// underneath them.
const DIMMED_ALPHA: u8 = 96;
/// Alpha for the selected shape.
const SELECTED_ALPHA: u8 = 200;
/// Fill for shapes with no linked unit yet.
const UNLINKED_FILL: Color32 = Color32::from_rgb(120, 120, 128);

pub fn status_color(status: UnitStatus) -> Color32 {
    match status {
        UnitStatus::Available => Color32::from_rgb(46, 160, 67),
        UnitStatus::Reserved => Color32::from_rgb(227, 179, 65),
        UnitStatus::Sold => Color32::from_rgb(203, 70, 56),
        UnitStatus::Blocked => Color32::from_rgb(110, 118, 129),
    }
}

/// Fill color for a shape: unit status when linked, neutral gray otherwise,
/// dimmed unless selected.
pub fn shape_fill(status: Option<UnitStatus>, selected: bool) -> Color32 {
    let base = status.map(status_color).unwrap_or(UNLINKED_FILL);
    let alpha = if selected { SELECTED_ALPHA } else { DIMMED_ALPHA };
    Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), alpha)
}

/// Outline drawn around the selected shape only.
pub fn selection_stroke() -> Stroke {
    Stroke::new(2.0, Color32::from_rgb(66, 133, 244))
}

/// Solid segments between confirmed draft points.
pub fn draft_stroke() -> Stroke {
    Stroke::new(1.5, Color32::from_rgb(66, 133, 244))
}

/// Dashed segment from the last confirmed point to the live pointer.
pub fn draft_preview_stroke() -> Stroke {
    Stroke::new(1.0, Color32::from_rgba_unmultiplied(66, 133, 244, 160))
}

/// Small square handle at each confirmed draft point.
pub fn draft_handle_fill() -> Color32 {
    Color32::from_rgb(235, 240, 250)
}

pub fn label_color() -> Color32 {
    Color32::from_rgb(24, 26, 30)
}

pub fn canvas_background() -> Color32 {
    Color32::from_gray(34)
}
