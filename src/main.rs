#![windows_subsystem = "windows"]

use eframe::egui;
use planfe::app::PlanFEApp;
use planfe::logger;

fn main() -> Result<(), eframe::Error> {
    // Session log (overwrites the previous session's file).
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_maximized(true)
            .with_title("PlanFE"),
        ..Default::default()
    };

    eframe::run_native(
        "PlanFE",
        options,
        Box::new(|cc| Box::new(PlanFEApp::new(cc))),
    )
}
