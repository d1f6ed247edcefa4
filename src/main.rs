mod app;
mod color;
mod config;
mod data;
mod pipeline;
mod state;
mod ui;


use std::path::PathBuf;

use app::LabDashApp;
use config::DashboardConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let mut config = DashboardConfig::discover();
    if let Some(path) = std::env::args_os().nth(1) {
        config.source = PathBuf::from(path);
    }

    let mut state = AppState::new(config);
    let source = state.config.source.clone();
    state.open(&source);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dashboard Laboratorial",
        options,
        Box::new(|_cc| Ok(Box::new(LabDashApp::new(state)))),
    )
}
