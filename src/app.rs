use eframe::egui;

use crate::state::AppState;
use crate::ui::{dashboard, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct LabDashApp {
    pub state: AppState,
}

impl LabDashApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for LabDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: table and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard::central_page(ui, &mut self.state);
        });

        // Widgets changed this frame: recompute and draw again with the new output.
        if self.state.dirty {
            self.state.refresh_if_dirty();
            ctx.request_repaint();
        }
    }
}
