//! Completion suggestion popup.

use bevy::prelude::*;
use bevy_egui::egui;

use crate::config::ConsoleConfig;
use crate::core::ConsoleState;

use super::ConsoleUiState;

/// The max amount of completion suggestions shown at once.
pub const MAX_COMPLETION_SUGGESTIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSuggestion {
    pub suggestion: String,
    /// Length of the typed prefix, highlighted in the popup.
    pub matched: usize,
}

#[derive(Resource, Default, Deref, DerefMut)]
pub struct AutoCompletions(pub Vec<CompletionSuggestion>);

/// Names starting with the word being typed. Nothing once arguments are typed.
pub fn suggestions(console: &ConsoleState, command: &str) -> Vec<CompletionSuggestion> {
    let keyword = command.strip_prefix('\\').unwrap_or(command);
    if keyword.is_empty() || keyword.contains(char::is_whitespace) {
        return Vec::new();
    }
    console
        .sorted_vars(Some(keyword))
        .into_iter()
        .filter(|name| name.len() > keyword.len())
        .take(MAX_COMPLETION_SUGGESTIONS)
        .map(|suggestion| CompletionSuggestion {
            suggestion,
            matched: keyword.len(),
        })
        .collect()
}

pub(crate) fn update_completions(
    mut state: ResMut<ConsoleUiState>,
    mut completions: ResMut<AutoCompletions>,
    console: Res<ConsoleState>,
) {
    if state.command == state.last_autocomplete_text {
        return;
    }
    state.last_autocomplete_text = state.command.clone();
    state.selected_completion = 0;
    completions.0 = suggestions(&console, &state.command);
}

pub fn completions_popup(
    response: &egui::Response,
    state: &ConsoleUiState,
    completions: &AutoCompletions,
    config: &ConsoleConfig,
) {
    let popup_id = response.id.with("completions");
    if completions.is_empty() {
        if egui::Popup::is_id_open(&response.ctx, popup_id) {
            egui::Popup::close_id(&response.ctx, popup_id);
        }
        return;
    }
    egui::Popup::open_id(&response.ctx, popup_id);

    egui::Popup::from_response(response)
        .id(popup_id)
        .close_behavior(egui::PopupCloseBehavior::CloseOnClickOutside)
        .align(egui::RectAlign::TOP_START)
        .show(|ui| {
            ui.vertical(|ui| {
                for (i, CompletionSuggestion { suggestion, matched }) in completions.iter().enumerate() {
                    let split = (*matched).min(suggestion.len());
                    let mut layout = egui::text::LayoutJob::default();
                    layout.append(&suggestion[..split], 0.0, config.theme.format_bold());
                    layout.append(&suggestion[split..], 0.0, config.theme.format_text());

                    let res = ui.label(layout);
                    if i == state.selected_completion {
                        res.highlight();
                    }
                }
            })
        });
}

/// Move the popup selection. Consumes the up and down arrow keys.
pub fn change_selected_completion(ui: &mut egui::Ui, state: &mut ConsoleUiState, completions: &[CompletionSuggestion]) {
    if ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowUp)) {
        state.selected_completion = state.selected_completion.saturating_sub(1);
    }
    if ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowDown)) {
        state.selected_completion = state
            .selected_completion
            .saturating_add(1)
            .min(completions.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CVar, CVarFlags, DefaultHost};

    #[test]
    fn test_suggestions() {
        let mut console = ConsoleState::new(DefaultHost::new(false, false));
        console.register(CVar::new("r_fov", 60));
        console.register(CVar::new("r_fullscreen", 0));
        console.register(CVar::new("r_hidden", 0).flags(CVarFlags::INVISIBLE));

        let names: Vec<_> = suggestions(&console, "R_F").into_iter().map(|s| s.suggestion).collect();
        assert_eq!(names, vec!["r_fov", "r_fullscreen"]);
        assert!(suggestions(&console, "r_fov 90").is_empty());
        assert!(suggestions(&console, "").is_empty());
        assert!(suggestions(&console, "r_h").is_empty());
    }
}
