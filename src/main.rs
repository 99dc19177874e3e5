#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;

fn main() -> eframe::Result<()> {
    let level = stave_timeline::logging::init();
    tracing::info!(%level, "starting stave timeline");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Stave Timeline"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Stave Timeline",
        options,
        Box::new(|cc| Ok(Box::new(app::DemoApp::new(cc)))),
    );
    if let Err(err) = &result {
        tracing::error!(%err, "application exited with an error");
    }
    result
}
