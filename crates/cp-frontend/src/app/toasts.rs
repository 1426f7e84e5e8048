//! Toast overlay

use std::time::Duration;

use crate::state::{AppAction, SharedAppState, TOAST_DURATION, ToastKind};

fn kind_color(kind: ToastKind) -> egui::Color32 {
    match kind {
        ToastKind::Info => egui::Color32::from_rgb(100, 150, 220),
        ToastKind::Success => egui::Color32::from_rgb(100, 200, 100),
        ToastKind::Error => egui::Color32::from_rgb(220, 90, 80),
    }
}

/// Render visible toasts in the bottom-right corner
pub fn render_toasts(ctx: &egui::Context, app_state: &SharedAppState, now: f64) {
    let toasts = {
        let mut state = app_state.lock();
        state.notifications.expire(now, TOAST_DURATION);
        state.notifications.toasts().to_vec()
    };
    if toasts.is_empty() {
        return;
    }

    let mut dismissed = Vec::new();
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-80.0, -72.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for toast in &toasts {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(320.0);
                    ui.horizontal(|ui| {
                        ui.colored_label(kind_color(toast.kind), &toast.message);
                        if ui.small_button("x").clicked() {
                            dismissed.push(toast.id);
                        }
                    });
                });
                ui.add_space(4.0);
            }
        });

    let mut state = app_state.lock();
    for id in dismissed {
        state.queue_action(AppAction::DismissToast(id));
    }
    ctx.request_repaint_after(Duration::from_millis(500));
}
