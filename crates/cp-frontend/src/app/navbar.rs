//! Top navigation bar

use cp_core::KernelContext;

use crate::state::{AppAction, SharedAppState};

/// Render the navbar
pub fn render_navbar(ctx: &egui::Context, app_state: &SharedAppState, kernel: &KernelContext) {
    egui::TopBottomPanel::top("navbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading("CadPrompt");
            ui.separator();

            let mut state = app_state.lock();
            let mut scene_enabled = state.scene_enabled;
            if ui.checkbox(&mut scene_enabled, "Grid scene").changed() {
                state.queue_action(AppAction::SetSceneEnabled(scene_enabled));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .selectable_label(state.sidebar.open, "Sidebar")
                    .on_hover_text("Show or hide the sidebar")
                    .clicked()
                {
                    state.queue_action(AppAction::ToggleSidebar);
                }
                ui.separator();
                ui.weak(format!("Kernel: {}", kernel.status()));
            });
        });
    });
}
