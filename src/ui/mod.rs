//! egui console window: scrollback, edit line, history and completion.

use bevy::prelude::*;
use bevy_egui::egui::text::LayoutJob;
use bevy_egui::*;

use crate::config::ConsoleConfig;
use crate::core::{ConsoleInputEvent, ConsoleLine, ConsoleOutputLevel, ConsoleState, ConsoleToggleEvent};

mod completions;
pub use completions::{AutoCompletions, CompletionSuggestion, MAX_COMPLETION_SUGGESTIONS, suggestions};
pub(crate) use completions::update_completions;

/// Prefix drawn before echoed statements.
pub const COMMAND_MESSAGE_PREFIX: &str = "] ";

#[derive(Default, Resource)]
pub struct ConsoleUiState {
    /// Whether focus was given to the edit line since the console opened.
    pub(crate) text_focus: bool,
    /// The text in the edit line.
    pub(crate) command: String,
    pub(crate) selected_completion: usize,
    pub(crate) last_autocomplete_text: String,
    /// Move the cursor to the end of the line on the next frame.
    pub(crate) cursor_to_end: bool,
}

impl ConsoleUiState {
    pub fn command(&self) -> &str {
        &self.command
    }
}

pub(crate) fn console_open(console: Res<ConsoleState>) -> bool {
    console.status()
}

/// Opening starts with an empty, focused edit line.
pub(crate) fn reset_on_open(mut toggles: MessageReader<ConsoleToggleEvent>, mut state: ResMut<ConsoleUiState>) {
    for event in toggles.read() {
        if event.open {
            state.command.clear();
            state.text_focus = false;
        }
    }
}

pub(crate) fn render_ui_system(
    mut contexts: EguiContexts,
    mut state: ResMut<ConsoleUiState>,
    mut console: ResMut<ConsoleState>,
    config: Res<ConsoleConfig>,
    completions: Res<AutoCompletions>,
    mut input_events: MessageWriter<ConsoleInputEvent>,
) -> Result<(), BevyError> {
    let mut open = true;
    egui::Window::new(config.title.as_str())
        .open(&mut open)
        .collapsible(false)
        .default_width(config.default_width)
        .default_height(config.default_height)
        .show(contexts.ctx_mut()?, |ui| {
            render_ui(ui, &mut state, &mut console, &config, &completions, &mut input_events)
        });
    if !open {
        console.show_console(false);
    }
    Ok(())
}

/// Draw the console into `ui`.
pub fn render_ui(
    ui: &mut egui::Ui,
    state: &mut ConsoleUiState,
    console: &mut ConsoleState,
    config: &ConsoleConfig,
    completions: &AutoCompletions,
    input_events: &mut MessageWriter<ConsoleInputEvent>,
) {
    fn submit_command(state: &mut ConsoleUiState, input_events: &mut MessageWriter<ConsoleInputEvent>) {
        let command = std::mem::take(&mut state.command);
        if !command.trim().is_empty() {
            input_events.write(ConsoleInputEvent::new(command));
        }
    }

    if completions.is_empty() {
        let up = ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowUp));
        let down = ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowDown));
        if up {
            if let Some(line) = console.history_element(true) {
                state.command = line.to_string();
                state.cursor_to_end = true;
            }
        } else if down {
            state.command = console.history_element(false).unwrap_or_default().to_string();
            state.cursor_to_end = true;
        }
    } else {
        completions::change_selected_completion(ui, state, completions);
        if ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowRight)) {
            if let Some(completion) = completions.get(state.selected_completion) {
                state.command = format!("{} ", completion.suggestion);
                state.cursor_to_end = true;
            }
        }
    }

    if ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Tab)) {
        state.command = console.process_completion(&state.command);
        state.cursor_to_end = true;
    }

    egui::TopBottomPanel::bottom("bottom panel")
        .frame(egui::Frame::NONE.outer_margin(egui::Margin {
            left: 5,
            right: 5,
            top: 11,
            bottom: 5,
        }))
        .show_inside(ui, |ui| {
            let text_edit_id = egui::Id::new("text_edit");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Submit").clicked() {
                    submit_command(state, input_events);
                    ui.ctx().memory_mut(|mem| mem.request_focus(text_edit_id));
                }

                let mut text_edit = egui::TextEdit::singleline(&mut state.command)
                    .id(text_edit_id)
                    .desired_width(ui.available_width())
                    .margin(egui::Vec2::splat(4.0))
                    .font(config.theme.font.clone())
                    .lock_focus(true)
                    .show(ui);

                if text_edit.response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit_command(state, input_events);
                    ui.ctx().memory_mut(|mem| mem.request_focus(text_edit_id));
                }

                if std::mem::take(&mut state.cursor_to_end) {
                    let end = egui::text::CCursor::new(state.command.chars().count());
                    text_edit
                        .state
                        .cursor
                        .set_char_range(Some(egui::text::CCursorRange::one(end)));
                    egui::TextEdit::store_state(ui.ctx(), text_edit_id, text_edit.state.clone());
                }

                completions::completions_popup(&text_edit.response, state, completions, config);

                if !state.text_focus {
                    state.text_focus = true;
                    ui.ctx().memory_mut(|mem| mem.request_focus(text_edit_id));
                }
            });
        });

    egui::ScrollArea::new([false, true])
        .auto_shrink([false, true])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                let lines = console
                    .lines()
                    .filter(|line| !(config.hide_debug && line.level == ConsoleOutputLevel::Debug));
                for (id, line) in lines.enumerate() {
                    add_line(ui, id, line, config);
                }
            });
        });
}

fn add_line(ui: &mut egui::Ui, id: usize, line: &ConsoleLine, config: &ConsoleConfig) {
    ui.push_id(id, |ui| {
        ui.label(format_line(line, config));
    });
}

fn format_line(line: &ConsoleLine, config: &ConsoleConfig) -> LayoutJob {
    let mut text = LayoutJob::default();
    if line.level == ConsoleOutputLevel::Command {
        text.append(COMMAND_MESSAGE_PREFIX, 0.0, config.theme.format_dark());
    }
    text.append(&line.text, 0.0, config.theme.format_level(line.level));
    text
}
