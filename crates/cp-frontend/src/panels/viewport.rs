//! 3D Viewport panel
//!
//! Paints the decorative scene and the model viewer on top of each other,
//! feeds pointer input to the viewer and shows load feedback.

use crate::state::{SharedAppState, SharedViewportState};

/// Page background behind both surfaces (#E2DFD2)
const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0xE2, 0xDF, 0xD2);

/// Scroll points per zoom step
const SCROLL_STEP: f32 = 100.0;

/// Render target size in physical pixels for a panel of `size` points
fn physical_size(size: egui::Vec2, pixels_per_point: f32) -> (u32, u32) {
    let pixels = size * pixels_per_point;
    (pixels.x.round() as u32, pixels.y.round() as u32)
}

/// 3D viewport panel
#[derive(Default)]
pub struct ViewportPanel;

impl ViewportPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        app_state: &SharedAppState,
        viewport_state: &SharedViewportState,
        render_state: Option<&egui_wgpu::RenderState>,
    ) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, BACKGROUND);

        let (width, height) = physical_size(rect.size(), ui.ctx().pixels_per_point());
        if width == 0 || height == 0 {
            return;
        }

        let dt = ui.input(|i| i.stable_dt);
        let mut state = viewport_state.lock();
        state.resize(width, height);

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            state.viewer.handle_drag(delta.x, delta.y);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                state.viewer.handle_scroll(scroll / SCROLL_STEP);
            }
        }
        let animating = state.advance(dt);

        let textures = match render_state {
            Some(render_state) => {
                let mut egui_renderer = render_state.renderer.write();
                state.render(&mut egui_renderer)
            }
            None => Default::default(),
        };

        let has_model = state.viewer.model().is_some();
        let show_hint = state.viewer.show_interaction_prompt();
        let alt = state.viewer.options().alt.clone();
        drop(state);

        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        for texture_id in [textures.scene, textures.viewer].into_iter().flatten() {
            painter.image(texture_id, rect, uv, egui::Color32::WHITE);
        }
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Other, true, &alt));

        let loading = app_state.lock().loading;
        if loading {
            ui.put(
                egui::Rect::from_center_size(rect.center(), egui::vec2(32.0, 32.0)),
                egui::Spinner::new().size(32.0),
            );
        } else if !has_model {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Type \"load step file\" below and press Enter",
                egui::FontId::proportional(16.0),
                egui::Color32::from_gray(90),
            );
        }

        if show_hint {
            painter.text(
                rect.center_bottom() - egui::vec2(0.0, 24.0),
                egui::Align2::CENTER_CENTER,
                "Drag to rotate, scroll to zoom",
                egui::FontId::proportional(14.0),
                egui::Color32::from_gray(60),
            );
        }

        if animating || loading {
            ui.ctx().request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_size_scales_by_pixels_per_point() {
        assert_eq!(physical_size(egui::vec2(400.0, 300.0), 1.0), (400, 300));
        assert_eq!(physical_size(egui::vec2(400.0, 300.0), 2.0), (800, 600));
        assert_eq!(physical_size(egui::vec2(100.3, 50.6), 1.5), (150, 76));
        assert_eq!(physical_size(egui::vec2(0.2, 10.0), 1.0), (0, 10));
    }
}
