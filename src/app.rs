use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use eframe::egui;
use egui::{Color32, ColorImage, RichText, TextureOptions, Vec2};

use crate::canvas::Canvas;
use crate::components::tools::{Tool, ToolAction, ToolsPanel};
use crate::io::{
    spawn_image_load, CancelSource, HostNotifier, InMemoryBackend, IoEvent, LoggingNotifier,
    MapImage, PlanImageStore, UnitStatus,
};
use crate::item::Point;
use crate::ops::autolink::unit_order;
use crate::ops::diff;
use crate::session::EditorSession;
use crate::settings::AppSettings;
use crate::store::{ClearFilter, DUPLICATE_OFFSET_PX};
use crate::theme;
use crate::viewer::ViewerPanel;
use crate::{log_err, log_info, log_warn};

const DEMO_MAP_ID: &str = "demo-plan";

#[derive(Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Edit,
    Preview,
}

pub struct PlanFEApp {
    backend: Arc<InMemoryBackend>,
    host: Arc<dyn HostNotifier>,
    settings: AppSettings,

    session: Option<EditorSession>,
    canvas: Canvas,
    map_meta: Option<MapImage>,

    view_mode: ViewMode,
    viewer: Option<ViewerPanel>,

    // Async IO pipeline (image loads, save runs)
    io_tx: Sender<IoEvent>,
    io_rx: Receiver<IoEvent>,
    editor_cancel: CancelSource,
    viewer_cancel: CancelSource,
    pending_loads: usize,
    saving: bool,

    /// Right-panel block filter; also the auto-link group when enabled.
    active_block: Option<String>,

    /// Unsaved-changes dialog state.
    confirm_close: bool,
    close_after_save: bool,
    force_close: bool,

    status_note: String,
}

impl PlanFEApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        let backend = Arc::new(demo_backend());
        let (io_tx, io_rx) = mpsc::channel();

        let mut app = Self {
            backend,
            host: Arc::new(LoggingNotifier),
            settings,
            session: None,
            canvas: Canvas::new(),
            map_meta: None,
            view_mode: ViewMode::Edit,
            viewer: None,
            io_tx,
            io_rx,
            editor_cancel: CancelSource::new(),
            viewer_cancel: CancelSource::new(),
            pending_loads: 0,
            saving: false,
            active_block: None,
            confirm_close: false,
            close_after_save: false,
            force_close: false,
            status_note: String::new(),
        };
        app.mount_editor();
        app
    }

    /// Load (or reload) the editing session and kick off the image load.
    fn mount_editor(&mut self) {
        match EditorSession::load(self.backend.as_ref(), DEMO_MAP_ID) {
            Ok(mut session) => {
                session
                    .tools
                    .set_marker_radius(self.settings.last_marker_radius);
                self.active_block = session.blocks().first().cloned();
                self.session = Some(session);
            }
            Err(e) => {
                log_err!("cannot load unit list: {}", e);
                self.status_note = format!("cannot load units: {}", e);
                return;
            }
        }
        match self.backend.map_image(DEMO_MAP_ID) {
            Ok(meta) => {
                self.request_editor_image(&meta.url);
                self.map_meta = Some(meta);
            }
            Err(e) => {
                log_warn!("no plan image: {}", e);
                self.status_note = "plan has no image; drawing on blank canvas".to_string();
            }
        }
    }

    fn request_editor_image(&mut self, url: &str) {
        self.editor_cancel.cancel_all();
        self.pending_loads += 1;
        spawn_image_load(
            Arc::clone(&self.backend) as Arc<dyn crate::io::PlanImageStore>,
            url.to_string(),
            self.editor_cancel.token(),
            "editor".to_string(),
            self.io_tx.clone(),
        );
    }

    fn request_viewer_image(&mut self, url: &str) {
        self.viewer_cancel.cancel_all();
        self.pending_loads += 1;
        spawn_image_load(
            Arc::clone(&self.backend) as Arc<dyn crate::io::PlanImageStore>,
            url.to_string(),
            self.viewer_cancel.token(),
            "viewer".to_string(),
            self.io_tx.clone(),
        );
    }

    // ------------------------------------------------------------------
    // Async event pump
    // ------------------------------------------------------------------

    fn pump_io_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.io_rx.try_recv() {
            match event {
                IoEvent::ImageLoaded {
                    token,
                    tag,
                    rgba,
                    size,
                } => {
                    self.pending_loads = self.pending_loads.saturating_sub(1);
                    if token.is_cancelled() {
                        // Stale load from a torn-down instance: drop on the
                        // floor, by contract without even logging.
                        continue;
                    }
                    let color = ColorImage::from_rgba_unmultiplied(size, &rgba);
                    let pixel_size = Vec2::new(size[0] as f32, size[1] as f32);
                    let texture =
                        ctx.load_texture(format!("plan-{}", tag), color, TextureOptions::LINEAR);
                    match tag.as_str() {
                        "viewer" => {
                            if let Some(viewer) = self.viewer.as_mut() {
                                viewer.set_image(texture, pixel_size);
                            }
                        }
                        _ => self.canvas.set_image(texture, pixel_size),
                    }
                }
                IoEvent::ImageFailed { token, tag, error } => {
                    self.pending_loads = self.pending_loads.saturating_sub(1);
                    if token.is_cancelled() {
                        continue;
                    }
                    log_err!("plan image load failed ({}): {}", tag, error);
                    self.status_note = format!("image load failed: {}", error);
                    if tag != "viewer" {
                        self.canvas.clear_image();
                    }
                }
                IoEvent::SaveFinished { result } => {
                    self.saving = false;
                    match result {
                        Ok(outcome) => {
                            if let Some(session) = self.session.as_mut() {
                                session.mark_saved();
                            }
                            self.host.save_completed(outcome.total());
                            self.host.invalidate_unit_cache();
                            self.status_note = format!(
                                "saved: {} updated, {} cleared",
                                outcome.updated, outcome.removed
                            );
                            if self.close_after_save {
                                self.force_close = true;
                                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                            }
                        }
                        Err(e) => {
                            // The shape store was not touched: the operator
                            // retries from the current unsaved state.
                            self.host.save_failed(&e.to_string());
                            self.status_note = format!("save failed: {}", e);
                            self.close_after_save = false;
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    fn start_save(&mut self) {
        if self.saving {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let plan = session.diff_plan();
        if plan.is_empty() {
            self.status_note = "no changes to save".to_string();
            self.close_after_save = false;
            return;
        }
        log_info!(
            "saving plan: {} updates, {} clears",
            plan.changed.len(),
            plan.removed.len()
        );
        self.saving = true;
        let backend = Arc::clone(&self.backend);
        let tx = self.io_tx.clone();
        std::thread::spawn(move || {
            let result = diff::execute(&plan, backend.as_ref());
            let _ = tx.send(IoEvent::SaveFinished { result });
        });
    }

    // ------------------------------------------------------------------
    // Image replacement
    // ------------------------------------------------------------------

    fn replace_plan_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file()
        else {
            return;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.status_note = format!("cannot read {}: {}", path.display(), e);
                return;
            }
        };
        let decoded = match image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                self.status_note = format!("not a usable image: {}", e);
                return;
            }
        };
        let (w, h) = (decoded.width(), decoded.height());
        match self.backend.upload_image(DEMO_MAP_ID, bytes, w, h) {
            Ok(meta) => {
                log_info!("plan image replaced: {}x{} at {}", w, h, meta.url);
                self.request_editor_image(&meta.url);
                self.map_meta = Some(meta);
            }
            Err(e) => {
                self.status_note = format!("upload failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Preview mode
    // ------------------------------------------------------------------

    fn enter_preview(&mut self) {
        match ViewerPanel::load(self.backend.as_ref(), DEMO_MAP_ID) {
            Ok(viewer) => {
                self.viewer = Some(viewer);
                if let Some(meta) = self.map_meta.clone() {
                    self.request_viewer_image(&meta.url);
                }
                self.view_mode = ViewMode::Preview;
            }
            Err(e) => {
                self.status_note = format!("cannot open preview: {}", e);
            }
        }
    }

    fn leave_preview(&mut self) {
        // Tear down the viewer instance; any in-flight load for it becomes
        // stale and is discarded by its token.
        self.viewer_cancel.cancel_all();
        self.viewer = None;
        self.view_mode = ViewMode::Edit;
    }

    // ------------------------------------------------------------------
    // UI
    // ------------------------------------------------------------------

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("PlanFE");
                ui.separator();

                let dirty = self.session.as_ref().is_some_and(|s| s.is_dirty());
                let save_label = if self.saving { "Saving…" } else { "Save" };
                if ui
                    .add_enabled(dirty && !self.saving, egui::Button::new(save_label))
                    .clicked()
                {
                    self.start_save();
                }

                match self.view_mode {
                    ViewMode::Edit => {
                        if ui.button("Preview").clicked() {
                            self.enter_preview();
                        }
                    }
                    ViewMode::Preview => {
                        if ui.button("Back to editor").clicked() {
                            self.leave_preview();
                        }
                    }
                }

                if self.view_mode == ViewMode::Edit {
                    if ui.button("Replace image").clicked() {
                        self.replace_plan_image();
                    }

                    ui.menu_button("Clear", |ui| {
                        let mut clear = None;
                        if ui.button("All shapes").clicked() {
                            clear = Some(ClearFilter::All);
                        }
                        if ui.button("Markers only").clicked() {
                            clear = Some(ClearFilter::MarkersOnly);
                        }
                        if ui.button("Polygons only").clicked() {
                            clear = Some(ClearFilter::PolygonsOnly);
                        }
                        if let Some(filter) = clear {
                            if let Some(session) = self.session.as_mut() {
                                let n = session.clear_shapes(filter);
                                self.status_note = format!("removed {} shape(s)", n);
                            }
                            ui.close_menu();
                        }
                    });
                }

                ui.separator();
                if ui.button("−").clicked() {
                    self.zoom_step(1.0 / 1.2);
                }
                if ui.button("+").clicked() {
                    self.zoom_step(1.2);
                }
                if ui.button("Fit").clicked() {
                    match self.view_mode {
                        ViewMode::Edit => self.canvas.fit_to_window(),
                        ViewMode::Preview => {
                            if let Some(viewer) = self.viewer.as_mut() {
                                viewer.viewport.reset_view();
                            }
                        }
                    }
                }
                if ui.button("Reset view").clicked() {
                    match self.view_mode {
                        ViewMode::Edit => self.canvas.viewport.reset_view(),
                        ViewMode::Preview => {
                            if let Some(viewer) = self.viewer.as_mut() {
                                viewer.viewport.reset_view();
                            }
                        }
                    }
                }

                let mut show_labels = self.settings.show_labels;
                if ui.checkbox(&mut show_labels, "Labels").changed() {
                    self.settings.show_labels = show_labels;
                    if let Err(e) = self.settings.save() {
                        log_warn!("settings not saved: {}", e);
                    }
                }
            });
        });
    }

    /// Button zoom: anchored at the canvas center rather than the pointer.
    fn zoom_step(&mut self, factor: f32) {
        match self.view_mode {
            ViewMode::Edit => {
                let center = self.canvas.viewport.canvas_rect().center();
                self.canvas.viewport.zoom_by(center, factor);
            }
            ViewMode::Preview => {
                if let Some(viewer) = self.viewer.as_mut() {
                    let center = viewer.viewport.canvas_rect().center();
                    viewer.viewport.zoom_by(center, factor);
                }
            }
        }
    }

    fn tool_strip(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut actions: Vec<ToolAction> = Vec::new();
        egui::SidePanel::left("tool_strip")
            .resizable(false)
            .default_width(110.0)
            .show(ctx, |ui| {
                let has_selection = session.selection_hotkeys_active();
                let marker_radius = session
                    .store
                    .selected_item()
                    .filter(|_| has_selection)
                    .and_then(|item| item.radius);
                ToolsPanel::show(
                    ui,
                    &mut session.tools,
                    has_selection,
                    marker_radius,
                    &mut actions,
                );
            });
        for action in actions {
            self.apply_tool_action(action);
        }

        // Remember the marker radius across sessions.
        let radius = self
            .session
            .as_ref()
            .map(|s| s.tools.marker_radius())
            .unwrap_or(self.settings.last_marker_radius);
        if (radius - self.settings.last_marker_radius).abs() > f32::EPSILON {
            self.settings.last_marker_radius = radius;
            let _ = self.settings.save();
        }
    }

    fn apply_tool_action(&mut self, action: ToolAction) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match action {
            ToolAction::FinishPolygon => {
                let _ = session.finish_polygon();
            }
            ToolAction::UndoPoint => {
                session.tools.undo_point();
            }
            ToolAction::DeleteSelected => {
                session.delete_selected();
            }
            ToolAction::DuplicateSelected => {
                let offset = self
                    .canvas
                    .viewport
                    .screen_to_model_distance(DUPLICATE_OFFSET_PX);
                session.duplicate_selected(Vec2::new(offset, offset));
            }
            ToolAction::SetSelectedRadius(radius) => {
                if let Some(id) = session.store.selected() {
                    session.store.set_marker_radius(id, radius);
                }
            }
        }
    }

    fn unit_panel(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        egui::SidePanel::right("unit_panel")
            .resizable(true)
            .default_width(230.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.label(RichText::new("Block").size(11.0).color(Color32::GRAY));
                let blocks = session.blocks();
                let selected_text = self
                    .active_block
                    .clone()
                    .unwrap_or_else(|| "—".to_string());
                egui::ComboBox::from_id_source("block_picker")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        for block in &blocks {
                            let checked = self.active_block.as_deref() == Some(block);
                            if ui.selectable_label(checked, block).clicked() {
                                self.active_block = Some(block.clone());
                                // Re-target the auto-link group if active.
                                if session.autolink.enabled() {
                                    session.autolink.enable(block);
                                }
                            }
                        }
                    });

                let mut sequence = session.autolink.enabled();
                if ui
                    .checkbox(&mut sequence, "Auto-link in sequence")
                    .changed()
                {
                    match (sequence, self.active_block.as_deref()) {
                        (true, Some(block)) => session.autolink.enable(block),
                        _ => session.autolink.disable(),
                    }
                }

                if session.autolink.enabled() {
                    match session.autolink.peek_next(&session.units, &session.store) {
                        Some(unit) => {
                            ui.label(format!("Next: {}", unit.code));
                        }
                        None => {
                            ui.label(
                                RichText::new("All units linked")
                                    .color(theme::status_color(UnitStatus::Available)),
                            );
                        }
                    }
                }

                ui.separator();

                let Some(block) = self.active_block.clone() else {
                    return;
                };
                let mut units: Vec<_> = session
                    .units
                    .iter()
                    .filter(|u| u.block == block)
                    .cloned()
                    .collect();
                units.sort_by(unit_order);

                let mut select_shape = None;
                let mut link_unit = None;
                let mut unlink = false;
                let can_link = session.selection_hotkeys_active();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for unit in &units {
                        ui.horizontal(|ui| {
                            ui.colored_label(theme::status_color(unit.status), "●");
                            let linked = session.store.is_unit_linked(&unit.id);
                            let floor = unit
                                .floor
                                .map(|f| format!("F{}", f))
                                .unwrap_or_else(|| "—".to_string());
                            let text = format!("{}  {}", unit.code, floor);
                            if linked {
                                if ui.link(text).clicked() {
                                    select_shape = Some(unit.id.clone());
                                }
                            } else {
                                ui.label(RichText::new(text).color(Color32::GRAY));
                                if can_link && ui.small_button("link").clicked() {
                                    link_unit = Some(unit.id.clone());
                                }
                            }
                        });
                    }
                });

                ui.separator();
                let selected = session.store.selected_item();
                if let Some(item) = selected {
                    if let Some(unit_id) = item.linked_unit.clone() {
                        let code = session
                            .unit(&unit_id)
                            .map(|u| u.code.clone())
                            .unwrap_or(unit_id);
                        ui.label(format!("Selected → unit {}", code));
                        if ui.small_button("Unlink").clicked() {
                            unlink = true;
                        }
                    } else {
                        ui.label("Selected shape is unlinked");
                    }
                }

                if let Some(unit_id) = select_shape
                    && let Some(item) = session.store.item_for_unit(&unit_id)
                {
                    let id = item.id;
                    session.tools.set_tool(Tool::Select);
                    session.store.select(Some(id));
                }
                if let Some(unit_id) = link_unit {
                    session.link_selected(&unit_id);
                }
                if unlink {
                    session.unlink_selected();
                }
            });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let zoom = match self.view_mode {
                    ViewMode::Edit => self.canvas.viewport.zoom(),
                    ViewMode::Preview => self
                        .viewer
                        .as_ref()
                        .map(|v| v.viewport.zoom())
                        .unwrap_or(1.0),
                };
                ui.label(format!("{:.0}%", zoom * 100.0));
                ui.separator();

                if let Some(Point { x, y }) = self.canvas.hover_model() {
                    ui.label(format!("{:.0}, {:.0} px", x, y));
                    ui.separator();
                }

                if let Some(session) = self.session.as_ref() {
                    ui.label(format!(
                        "{} shapes · {} linked",
                        session.store.len(),
                        session.store.linked_count()
                    ));
                    ui.separator();
                    if let Some(msg) = session.status_message() {
                        ui.label(msg);
                        ui.separator();
                    }
                }

                if !self.status_note.is_empty() {
                    ui.label(&self.status_note);
                }
            });
        });
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (delete, duplicate) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.modifiers.ctrl && i.key_pressed(egui::Key::D),
            )
        });
        if session.selection_hotkeys_active() {
            if delete {
                session.delete_selected();
            } else if duplicate {
                let offset = self
                    .canvas
                    .viewport
                    .screen_to_model_distance(DUPLICATE_OFFSET_PX);
                session.duplicate_selected(Vec2::new(offset, offset));
            }
        }
    }

    fn confirm_close_dialog(&mut self, ctx: &egui::Context) {
        if !self.confirm_close {
            return;
        }
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("The plan has unsaved link changes.");
                ui.horizontal(|ui| {
                    if ui.button("Save and close").clicked() {
                        self.confirm_close = false;
                        self.close_after_save = true;
                        self.start_save();
                    }
                    if ui.button("Discard").clicked() {
                        self.confirm_close = false;
                        self.force_close = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                    if ui.button("Keep editing").clicked() {
                        self.confirm_close = false;
                    }
                });
            });
    }
}

impl eframe::App for PlanFEApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_io_events(ctx);

        // Unsaved-changes guard on window close.
        if ctx.input(|i| i.viewport().close_requested()) {
            let dirty = self.session.as_ref().is_some_and(|s| s.is_dirty());
            if dirty && !self.force_close {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                self.confirm_close = true;
            }
        }

        self.top_bar(ctx);
        if self.view_mode == ViewMode::Edit {
            self.tool_strip(ctx);
            self.unit_panel(ctx);
        }
        self.status_bar(ctx);
        self.handle_keys(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.view_mode {
            ViewMode::Edit => {
                if let Some(session) = self.session.as_mut() {
                    self.canvas.show(ui, session, &self.settings);
                } else {
                    ui.centered_and_justified(|ui| {
                        ui.label("No plan loaded");
                    });
                }
            }
            ViewMode::Preview => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.show(ui, &self.settings);
                }
            }
        });

        self.confirm_close_dialog(ctx);

        // Keep polling while background work is in flight.
        if self.saving || self.pending_loads > 0 {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

// ============================================================================
// Demo dataset
// ============================================================================

/// Seed backend: two blocks of units plus a synthetic plan image, so the
/// editor is usable out of the box. A real deployment implements the `io`
/// traits against its API instead.
fn demo_backend() -> InMemoryBackend {
    use crate::io::Unit;
    use crate::item::Geometry;

    let mk = |id: &str, code: &str, block: &str, floor: Option<i32>, status: UnitStatus| Unit {
        id: id.to_string(),
        code: code.to_string(),
        block: block.to_string(),
        floor,
        status,
        typology: if code.ends_with('1') { "2BR" } else { "3BR" }.to_string(),
        area_m2: 58.0 + (code.len() as f32) * 7.5,
        price: 240_000.0,
        notes: String::new(),
        geometry: None,
    };

    let mut units = vec![
        mk("t1-g", "G-01", "T1", None, UnitStatus::Available),
        mk("t1-101", "101", "T1", Some(1), UnitStatus::Available),
        mk("t1-102", "102", "T1", Some(1), UnitStatus::Reserved),
        mk("t1-201", "201", "T1", Some(2), UnitStatus::Sold),
        mk("t1-202", "202", "T1", Some(2), UnitStatus::Available),
        mk("t2-101", "101", "T2", Some(1), UnitStatus::Available),
        mk("t2-102", "102", "T2", Some(1), UnitStatus::Blocked),
        mk("t2-201", "201", "T2", Some(2), UnitStatus::Available),
    ];

    // Two pre-linked shapes so the diff baseline is non-trivial on launch.
    units[3].geometry = Some(Geometry::polygon(vec![
        Point::new(220.0, 180.0),
        Point::new(420.0, 180.0),
        Point::new(420.0, 330.0),
        Point::new(220.0, 330.0),
    ]));
    units[5].geometry = Some(Geometry::marker(Point::new(900.0, 520.0), 22.0));

    let backend = InMemoryBackend::new(units);
    let (bytes, w, h) = demo_plan_png();
    backend.set_map_image(
        DEMO_MAP_ID,
        MapImage {
            url: "mem://plans/demo".to_string(),
            pixel_width: w,
            pixel_height: h,
        },
        bytes,
    );
    backend
}

/// Render a plain schematic plan (paper background + grid + two building
/// outlines) and encode it as PNG for the in-memory blob store.
fn demo_plan_png() -> (Vec<u8>, u32, u32) {
    use image::{DynamicImage, Rgba, RgbaImage};

    let (w, h) = (1400u32, 900u32);
    let mut img = RgbaImage::from_pixel(w, h, Rgba([244, 241, 234, 255]));

    for y in 0..h {
        for x in 0..w {
            if x % 100 == 0 || y % 100 == 0 {
                img.put_pixel(x, y, Rgba([224, 220, 210, 255]));
            }
        }
    }
    let outline = Rgba([150, 146, 138, 255]);
    for (x0, y0, x1, y1) in [(180u32, 140u32, 640u32, 700u32), (760, 140, 1220, 700)] {
        for x in x0..=x1 {
            img.put_pixel(x, y0, outline);
            img.put_pixel(x, y1, outline);
        }
        for y in y0..=y1 {
            img.put_pixel(x0, y, outline);
            img.put_pixel(x1, y, outline);
        }
    }

    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    if let Err(e) =
        DynamicImage::ImageRgba8(img).write_to(&mut cursor, image::ImageOutputFormat::Png)
    {
        log_err!("demo plan encode failed: {}", e);
    }
    (bytes, w, h)
}
