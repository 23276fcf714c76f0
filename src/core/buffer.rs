//! Scrollback line buffer and output sinks.

use std::collections::VecDeque;

use super::ConsoleOutputLevel;

/// Lines longer than this are not extended by [`LineBuffer::add_line_plus`].
const LINE_PLUS_LIMIT: usize = 256;

/// One line of console output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub text: String,
    pub level: ConsoleOutputLevel,
}

impl ConsoleLine {
    pub fn new(level: ConsoleOutputLevel, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }
}

/// Receives every line posted to the console.
pub trait OutputPrintSink: Send + Sync {
    fn print(&mut self, line: &ConsoleLine);
}

/// Handle returned when adding an [`OutputPrintSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSinkId(u64);

/// Bounded scrollback.
///
/// Posted lines also go to an outbox that the plugin turns into
/// `ConsoleOutputEvent`s; the outbox is bounded by the same capacity.
#[derive(Default)]
pub struct LineBuffer {
    lines: VecDeque<ConsoleLine>,
    sinks: Vec<(OutputSinkId, Box<dyn OutputPrintSink>)>,
    next_sink_id: u64,
    outbox: VecDeque<ConsoleLine>,
    scroll_line: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add possibly multi-line text; each non-empty line is posted.
    pub fn add_line(&mut self, text: &str, level: ConsoleOutputLevel, capacity: usize) {
        let text = text.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            return;
        }
        for line in text.split(['\r', '\n']).filter(|l| !l.is_empty()) {
            self.post_line(ConsoleLine::new(level, line), capacity);
        }
    }

    /// Append a single line, dropping the oldest ones over `capacity`.
    pub fn post_line(&mut self, line: ConsoleLine, capacity: usize) {
        for (_, sink) in self.sinks.iter_mut() {
            sink.print(&line);
        }

        self.outbox.push_back(line.clone());
        while self.outbox.len() > capacity.max(1) {
            self.outbox.pop_front();
        }

        self.lines.push_back(line);
        while self.lines.len() > capacity {
            self.lines.pop_front();
        }
    }

    /// Extend the last line if it is short enough. Newlines become spaces.
    pub fn add_line_plus(&mut self, text: &str) {
        let Some(last) = self.lines.back_mut() else {
            return;
        };
        if last.text.len() >= LINE_PLUS_LIMIT {
            return;
        }
        let text = text.trim_end_matches(['\r', '\n']).replace(['\r', '\n'], " ");
        last.text.push_str(&text);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll_line = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `n` counted from the newest (0).
    pub fn get_line_no(&self, n: usize) -> Option<&ConsoleLine> {
        self.lines.len().checked_sub(n + 1).and_then(|i| self.lines.get(i))
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ConsoleLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&ConsoleLine> {
        self.lines.back()
    }

    pub fn scroll_line(&self) -> usize {
        self.scroll_line
    }

    /// Scroll towards older lines.
    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.lines.len().saturating_sub(1);
        self.scroll_line = (self.scroll_line + lines).min(max);
    }

    /// Scroll towards newer lines.
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_line = self.scroll_line.saturating_sub(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_line = self.lines.len().saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_line = 0;
    }

    pub fn add_sink(&mut self, sink: Box<dyn OutputPrintSink>) -> OutputSinkId {
        let id = OutputSinkId(self.next_sink_id);
        self.next_sink_id += 1;
        self.sinks.push((id, sink));
        id
    }

    pub fn remove_sink(&mut self, id: OutputSinkId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
        self.sinks.len() != before
    }

    pub(crate) fn drain_outbox(&mut self) -> impl Iterator<Item = ConsoleLine> + '_ {
        self.outbox.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Collect(Arc<Mutex<Vec<String>>>);

    impl OutputPrintSink for Collect {
        fn print(&mut self, line: &ConsoleLine) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(line.text.clone());
            }
        }
    }

    fn texts(buffer: &LineBuffer) -> Vec<&str> {
        buffer.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_add_line_splits() {
        let mut buffer = LineBuffer::new();
        buffer.add_line("one\r\ntwo\n\nthree\n", ConsoleOutputLevel::Info, 100);
        assert_eq!(texts(&buffer), vec!["one", "two", "three"]);

        buffer.add_line("\n", ConsoleOutputLevel::Info, 100);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_capacity() {
        let mut buffer = LineBuffer::new();
        for i in 0..5 {
            buffer.add_line(&i.to_string(), ConsoleOutputLevel::Info, 3);
        }
        assert_eq!(texts(&buffer), vec!["2", "3", "4"]);
        assert_eq!(buffer.get_line_no(0).map(|l| l.text.as_str()), Some("4"));
        assert_eq!(buffer.get_line_no(2).map(|l| l.text.as_str()), Some("2"));
        assert!(buffer.get_line_no(3).is_none());
    }

    #[test]
    fn test_add_line_plus() {
        let mut buffer = LineBuffer::new();
        buffer.add_line_plus("ignored");
        assert!(buffer.is_empty());

        buffer.add_line("loading", ConsoleOutputLevel::Info, 10);
        buffer.add_line_plus("...\ndone");
        assert_eq!(texts(&buffer), vec!["loading... done"]);

        let long = "x".repeat(LINE_PLUS_LIMIT);
        buffer.add_line(&long, ConsoleOutputLevel::Info, 10);
        buffer.add_line_plus("y");
        assert_eq!(buffer.last().map(|l| l.text.len()), Some(LINE_PLUS_LIMIT));
    }

    #[test]
    fn test_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut buffer = LineBuffer::new();
        let id = buffer.add_sink(Box::new(Collect(seen.clone())));

        buffer.add_line("a\nb", ConsoleOutputLevel::Info, 10);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);

        assert!(buffer.remove_sink(id));
        assert!(!buffer.remove_sink(id));
        buffer.add_line("c", ConsoleOutputLevel::Info, 10);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_scrolling() {
        let mut buffer = LineBuffer::new();
        for i in 0..30 {
            buffer.add_line(&i.to_string(), ConsoleOutputLevel::Info, 100);
        }
        buffer.scroll_up(21);
        assert_eq!(buffer.scroll_line(), 21);
        buffer.scroll_up(21);
        assert_eq!(buffer.scroll_line(), 29);
        buffer.scroll_down(1);
        assert_eq!(buffer.scroll_line(), 28);
        buffer.scroll_to_bottom();
        assert_eq!(buffer.scroll_line(), 0);
    }

    #[test]
    fn test_outbox_drains() {
        let mut buffer = LineBuffer::new();
        buffer.add_line("hello", ConsoleOutputLevel::Warn, 10);
        let drained: Vec<_> = buffer.drain_outbox().collect();
        assert_eq!(drained, vec![ConsoleLine::new(ConsoleOutputLevel::Warn, "hello")]);
        assert_eq!(buffer.drain_outbox().count(), 0);
        assert_eq!(buffer.len(), 1);
    }
}
