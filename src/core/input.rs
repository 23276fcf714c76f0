//! Edit line and key handling.

use bevy::prelude::*;

use super::binds::{KeyModifiers, bind_name};
use super::interpreter::{execute_input_buffer, execute_string_internal};
use super::ConsoleState;

/// Lines scrolled by PageUp/PageDown with Ctrl held.
const PAGE_SCROLL: usize = 21;

/// Text typed into the console with a cursor.
///
/// The cursor is a byte offset that always sits on a character boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the text and put the cursor at its end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Insert at the cursor, dropping control characters.
    pub fn insert(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.text.insert(self.cursor, c);
            self.cursor += c.len_utf8();
        }
    }

    /// Remove the character before the cursor (`backspace`) or after it.
    pub fn remove_char(&mut self, backspace: bool) {
        if backspace {
            if let Some(c) = self.text[..self.cursor].chars().next_back() {
                self.cursor -= c.len_utf8();
                self.text.remove(self.cursor);
            }
        } else if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(c) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.len();
    }
}

/// Keys the console reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConsoleKey {
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Tab,
    PageUp,
    PageDown,
    Home,
    End,
    Escape,
    /// The console toggle key.
    Tilde,
    /// Any other key, by bind name (`f1`, `a`, `space`, ...).
    Named(String),
}

impl ConsoleKey {
    /// Name used to look up key binds.
    pub fn bind_name(&self) -> &str {
        match self {
            ConsoleKey::Enter => "enter",
            ConsoleKey::Backspace => "backspace",
            ConsoleKey::Delete => "delete",
            ConsoleKey::Left => "left",
            ConsoleKey::Right => "right",
            ConsoleKey::Up => "up",
            ConsoleKey::Down => "down",
            ConsoleKey::Tab => "tab",
            ConsoleKey::PageUp => "pageup",
            ConsoleKey::PageDown => "pagedown",
            ConsoleKey::Home => "home",
            ConsoleKey::End => "end",
            ConsoleKey::Escape => "escape",
            ConsoleKey::Tilde => "tilde",
            ConsoleKey::Named(name) => name,
        }
    }
}

/// Handle a key press. Returns true if the console consumed it.
///
/// While the console is closed, a key bind for the key (with modifier
/// prefixes) is executed as if typed.
pub fn process_key(world: &mut World, key: ConsoleKey, modifiers: KeyModifiers) -> bool {
    let bound = {
        let mut console = world.resource_mut::<ConsoleState>();
        if !console.status() {
            let name = bind_name(key.bind_name(), modifiers);
            let command = console.find_key_bind(&name).map(str::to_string);
            if command.is_some() {
                console.set_input_line("");
            }
            command
        } else {
            if key != ConsoleKey::Tab {
                console.reset_auto_completion();
            }
            None
        }
    };
    if let Some(command) = bound {
        execute_string_internal(world, &command, true, false);
    }

    let mut console = world.resource_mut::<ConsoleState>();
    if key == ConsoleKey::Tilde && console.activation_key_enabled() {
        let open = !console.status();
        console.show_console(open);
        console.set_console_key_pressed();
        return true;
    }

    if key == ConsoleKey::Escape && console.status() {
        console.show_console(false);
        console.set_console_key_pressed();
        return true;
    }

    process_input(world, key, modifiers)
}

/// Edit-line handling for an open console.
fn process_input(world: &mut World, key: ConsoleKey, modifiers: KeyModifiers) -> bool {
    let mut console = world.resource_mut::<ConsoleState>();
    if !console.status() {
        return false;
    }

    let ctrl = modifiers.contains(KeyModifiers::CTRL);
    match key {
        ConsoleKey::Enter => {
            drop(console);
            execute_input_buffer(world);
            world.resource_mut::<ConsoleState>().buffer.scroll_to_bottom();
        }
        ConsoleKey::Backspace => console.remove_input_char(true),
        ConsoleKey::Delete => console.remove_input_char(false),
        ConsoleKey::Left => console.input.move_left(),
        ConsoleKey::Right => console.input.move_right(),
        ConsoleKey::Up => {
            if let Some(line) = console.history.element(true).map(str::to_string) {
                console.input.set(&line);
            }
        }
        ConsoleKey::Down => {
            if let Some(line) = console.history.element(false).map(str::to_string) {
                console.input.set(&line);
            }
        }
        ConsoleKey::Tab => {
            if !modifiers.contains(KeyModifiers::ALT) {
                let line = console.input.text().to_string();
                let completed = console.process_completion(&line);
                console.input.set(&completed);
            }
        }
        ConsoleKey::PageUp => console.buffer.scroll_up(if ctrl { PAGE_SCROLL } else { 1 }),
        ConsoleKey::PageDown => console.buffer.scroll_down(if ctrl { PAGE_SCROLL } else { 1 }),
        ConsoleKey::Home => {
            if ctrl {
                console.buffer.scroll_to_top();
            } else {
                console.input.home();
            }
        }
        ConsoleKey::End => {
            if ctrl {
                console.buffer.scroll_to_bottom();
            } else {
                console.input.end();
            }
        }
        ConsoleKey::Escape | ConsoleKey::Tilde | ConsoleKey::Named(_) => {}
    }
    true
}

/// Insert typed text while the console is open.
///
/// The toggle characters are ignored so opening the console does not type them.
pub fn on_text_input(console: &mut ConsoleState, text: &str) -> bool {
    if !console.status() {
        return false;
    }
    if matches!(text, "~" | "`" | "²") {
        return false;
    }
    console.add_input_utf8(text);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandHandlers, DefaultHost};

    #[test]
    fn test_open_console_swallows_named_keys() {
        let mut world = World::new();
        world.insert_resource(ConsoleState::new(DefaultHost::new(false, false)));
        world.init_resource::<CommandHandlers>();

        let f1 = ConsoleKey::Named("f1".into());
        assert!(!process_key(&mut world, f1.clone(), KeyModifiers::empty()));

        world.resource_mut::<ConsoleState>().show_console(true);
        assert!(process_key(&mut world, f1, KeyModifiers::empty()));
        assert!(world.resource::<ConsoleState>().status());
    }

    #[test]
    fn test_insert_filters_control() {
        let mut line = InputLine::new();
        line.insert("ab\tc\u{7}");
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor(), 3);
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut line = InputLine::new();
        line.set("ac");
        line.move_left();
        line.insert("b");
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn test_remove_multibyte() {
        let mut line = InputLine::new();
        line.set("aé€");
        line.remove_char(true);
        assert_eq!(line.text(), "aé");
        line.home();
        line.move_right();
        line.remove_char(false);
        assert_eq!(line.text(), "a");
        line.remove_char(false);
        assert_eq!(line.text(), "a");
    }

    #[test]
    fn test_cursor_moves_by_char() {
        let mut line = InputLine::new();
        line.set("é€");
        line.move_left();
        assert_eq!(line.cursor(), "é".len());
        line.move_left();
        line.move_left();
        assert_eq!(line.cursor(), 0);
        line.end();
        line.move_right();
        assert_eq!(line.cursor(), line.text().len());
    }

    #[test]
    fn test_backspace_at_start() {
        let mut line = InputLine::new();
        line.set("x");
        line.home();
        line.remove_char(true);
        assert_eq!(line.text(), "x");
    }

    #[test]
    fn test_key_bind_names() {
        assert_eq!(ConsoleKey::Named("f1".into()).bind_name(), "f1");
        assert_eq!(ConsoleKey::PageUp.bind_name(), "pageup");
    }
}
