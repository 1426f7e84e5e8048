//! Prompt box

use cp_core::{KeyIntent, prompt_key_intent};

use crate::state::SharedAppState;

/// Render the prompt box at the bottom of the window.
///
/// Enter submits the text, Shift+Enter inserts a line break.
pub fn render_prompt(ctx: &egui::Context, app_state: &SharedAppState) {
    egui::TopBottomPanel::bottom("prompt_panel").show(ctx, |ui| {
        ui.add_space(6.0);
        let id = egui::Id::new("prompt_input");
        let focused = ui.memory(|memory| memory.has_focus(id));
        let submit = focused
            && ui.input_mut(|input| {
                let intent =
                    prompt_key_intent(input.key_pressed(egui::Key::Enter), input.modifiers.shift);
                intent == KeyIntent::Submit
                    && input.consume_key(egui::Modifiers::NONE, egui::Key::Enter)
            });

        let mut state = app_state.lock();
        if submit {
            state.submit_prompt();
        }
        ui.add(
            egui::TextEdit::multiline(&mut state.prompt.text)
                .id(id)
                .hint_text("Type a command, e.g. \"load step file\"")
                .desired_rows(1)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(6.0);
    });
}
