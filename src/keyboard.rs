//! Bevy keyboard input for the console: the toggle key, key binds and, when
//! no UI owns it, the edit line.

use bevy::input::ButtonState;
use bevy::input::keyboard::KeyboardInput;
use bevy::prelude::*;

use crate::core::{ConsoleKey, ConsoleState, KeyModifiers, on_text_input, process_key};

/// Keyboard handling switches.
#[derive(Resource, Debug, Clone)]
pub struct ConsoleKeyboard {
    /// Edit the console's input line from key presses and text input. Turned
    /// off when a UI front-end edits the line itself.
    pub edit_line: bool,
}

impl Default for ConsoleKeyboard {
    fn default() -> Self {
        Self { edit_line: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Key(ConsoleKey, KeyModifiers),
    Text(String),
}

/// Key presses read this frame, applied with `World` access by the console update.
#[derive(Resource, Default)]
pub(crate) struct PendingKeys(pub(crate) Vec<KeyAction>);

/// Map a physical key to a console key.
pub fn console_key(code: KeyCode) -> Option<ConsoleKey> {
    let key = match code {
        KeyCode::Enter | KeyCode::NumpadEnter => ConsoleKey::Enter,
        KeyCode::Backspace => ConsoleKey::Backspace,
        KeyCode::Delete => ConsoleKey::Delete,
        KeyCode::ArrowLeft => ConsoleKey::Left,
        KeyCode::ArrowRight => ConsoleKey::Right,
        KeyCode::ArrowUp => ConsoleKey::Up,
        KeyCode::ArrowDown => ConsoleKey::Down,
        KeyCode::Tab => ConsoleKey::Tab,
        KeyCode::PageUp => ConsoleKey::PageUp,
        KeyCode::PageDown => ConsoleKey::PageDown,
        KeyCode::Home => ConsoleKey::Home,
        KeyCode::End => ConsoleKey::End,
        KeyCode::Escape => ConsoleKey::Escape,
        KeyCode::Backquote => ConsoleKey::Tilde,
        KeyCode::Space => ConsoleKey::Named("space".into()),
        KeyCode::ControlLeft
        | KeyCode::ControlRight
        | KeyCode::ShiftLeft
        | KeyCode::ShiftRight
        | KeyCode::AltLeft
        | KeyCode::AltRight
        | KeyCode::SuperLeft
        | KeyCode::SuperRight => return None,
        other => ConsoleKey::Named(key_name(other)?),
    };
    Some(key)
}

/// Lower-case bind name for letters, digits and function keys.
fn key_name(code: KeyCode) -> Option<String> {
    let debug = format!("{:?}", code);
    let name = if let Some(letter) = debug.strip_prefix("Key") {
        letter.to_ascii_lowercase()
    } else if let Some(digit) = debug.strip_prefix("Digit") {
        digit.to_string()
    } else if debug.starts_with('F') && debug[1..].chars().all(|c| c.is_ascii_digit()) && debug.len() > 1 {
        debug.to_ascii_lowercase()
    } else {
        return None;
    };
    Some(name)
}

pub fn modifiers(keys: &ButtonInput<KeyCode>) -> KeyModifiers {
    let mut modifiers = KeyModifiers::empty();
    modifiers.set(
        KeyModifiers::CTRL,
        keys.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]),
    );
    modifiers.set(
        KeyModifiers::SHIFT,
        keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
    );
    modifiers.set(KeyModifiers::ALT, keys.any_pressed([KeyCode::AltLeft, KeyCode::AltRight]));
    modifiers.set(
        KeyModifiers::SUPER,
        keys.any_pressed([KeyCode::SuperLeft, KeyCode::SuperRight]),
    );
    modifiers
}

pub(crate) fn read_keyboard(
    events: Option<MessageReader<KeyboardInput>>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut pending: ResMut<PendingKeys>,
) {
    let Some(mut events) = events else { return };
    let held = keys.map(|keys| modifiers(&keys)).unwrap_or_default();

    for event in events.read() {
        if event.state != ButtonState::Pressed {
            continue;
        }
        if let Some(key) = console_key(event.key_code) {
            pending.0.push(KeyAction::Key(key, held));
        }
        if let Some(text) = &event.text {
            if !text.chars().any(char::is_control) {
                pending.0.push(KeyAction::Text(text.to_string()));
            }
        }
    }
}

/// Apply the key presses read this frame.
pub(crate) fn apply_pending_keys(world: &mut World) {
    let Some(actions) = world
        .get_resource_mut::<PendingKeys>()
        .map(|mut pending| std::mem::take(&mut pending.0))
    else {
        return;
    };
    let edit_line = world
        .get_resource::<ConsoleKeyboard>()
        .is_none_or(|keyboard| keyboard.edit_line);

    for action in actions {
        let open = world.resource::<ConsoleState>().status();
        match action {
            KeyAction::Key(key, modifiers) => {
                let toggle = matches!(key, ConsoleKey::Tilde | ConsoleKey::Escape);
                if open && !edit_line && !toggle {
                    continue;
                }
                process_key(world, key, modifiers);
            }
            KeyAction::Text(text) => {
                if edit_line {
                    on_text_input(&mut world.resource_mut::<ConsoleState>(), &text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CVar, DefaultHost, CommandHandlers};

    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(ConsoleState::new(DefaultHost::new(false, false)));
        world.init_resource::<CommandHandlers>();
        world.init_resource::<PendingKeys>();
        world
    }

    fn push(world: &mut World, action: KeyAction) {
        world.resource_mut::<PendingKeys>().0.push(action);
    }

    #[test]
    fn test_console_key_mapping() {
        assert_eq!(console_key(KeyCode::Backquote), Some(ConsoleKey::Tilde));
        assert_eq!(console_key(KeyCode::KeyA), Some(ConsoleKey::Named("a".into())));
        assert_eq!(console_key(KeyCode::Digit7), Some(ConsoleKey::Named("7".into())));
        assert_eq!(console_key(KeyCode::F5), Some(ConsoleKey::Named("f5".into())));
        assert_eq!(console_key(KeyCode::ShiftLeft), None);
    }

    #[test]
    fn test_typing_and_enter() {
        let mut world = world();
        world.resource_mut::<ConsoleState>().register(CVar::new("r_fov", 60));

        push(&mut world, KeyAction::Key(ConsoleKey::Tilde, KeyModifiers::empty()));
        push(&mut world, KeyAction::Text("`".into()));
        push(&mut world, KeyAction::Text("r_fov 90".into()));
        push(&mut world, KeyAction::Key(ConsoleKey::Enter, KeyModifiers::empty()));
        apply_pending_keys(&mut world);

        let console = world.resource::<ConsoleState>();
        assert!(console.status());
        assert_eq!(console.get_cvar("r_fov").unwrap().get_i32(), 90);
        assert_eq!(console.input_line(), "");
        assert_eq!(console.history().len(), 1);
    }

    #[test]
    fn test_bind_runs_while_closed() {
        let mut world = world();
        world.resource_mut::<ConsoleState>().register(CVar::new("r_fov", 60));
        world.resource_mut::<ConsoleState>().create_key_bind("ctrl_f1", "r_fov 100");

        push(&mut world, KeyAction::Key(ConsoleKey::Named("f1".into()), KeyModifiers::CTRL));
        apply_pending_keys(&mut world);
        assert_eq!(world.resource::<ConsoleState>().get_cvar("r_fov").unwrap().get_i32(), 100);
    }

    #[test]
    fn test_ui_owned_edit_line() {
        let mut world = world();
        world.insert_resource(ConsoleKeyboard { edit_line: false });

        push(&mut world, KeyAction::Key(ConsoleKey::Tilde, KeyModifiers::empty()));
        push(&mut world, KeyAction::Text("abc".into()));
        push(&mut world, KeyAction::Key(ConsoleKey::Escape, KeyModifiers::empty()));
        apply_pending_keys(&mut world);

        let console = world.resource::<ConsoleState>();
        assert!(!console.status());
        assert_eq!(console.input_line(), "");
    }
}
