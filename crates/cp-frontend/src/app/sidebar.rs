//! Right sidebar and its menu windows

use crate::state::{AppAction, SharedAppState, SidebarMenu};

const BUTTON_COLUMN_WIDTH: f32 = 64.0;

/// Render the permanent button column, the sidebar and any open menus
pub fn render_sidebar(ctx: &egui::Context, app_state: &SharedAppState) {
    let mut state = app_state.lock();

    egui::SidePanel::right("sidebar_buttons")
        .resizable(false)
        .exact_width(BUTTON_COLUMN_WIDTH)
        .show(ctx, |ui| {
            ui.add_space(8.0);
            ui.vertical_centered(|ui| {
                for menu in SidebarMenu::ALL {
                    if ui
                        .selectable_label(state.sidebar.is_menu_open(menu), menu.label())
                        .clicked()
                    {
                        state.queue_action(AppAction::ToggleMenu(menu));
                    }
                }
            });
        });

    if state.sidebar.open {
        egui::SidePanel::right("sidebar")
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Tools");
                ui.separator();
                ui.weak("Pick a menu from the button column.");
            });
    }

    for menu in SidebarMenu::ALL {
        let mut open = state.sidebar.is_menu_open(menu);
        if !open {
            continue;
        }
        egui::Window::new(menu.label())
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.weak("Nothing here yet.");
            });
        if !open {
            state.queue_action(AppAction::ToggleMenu(menu));
        }
    }
}
