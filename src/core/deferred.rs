//! Deferred command queue.
//!
//! Lines executed while deferred mode is on (or with the defer flag) are kept
//! here and drained once per frame. Commands and variables flagged
//! `BLOCKFRAME` end the drain for the current frame, and the `wait_frames` /
//! `wait_seconds` commands pause it.

use std::collections::VecDeque;
use std::time::Duration;

/// A queued line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredCommand {
    pub command: String,
    pub silent: bool,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    commands: VecDeque<DeferredCommand>,
    wait_frames: u32,
    wait_until: Option<Duration>,
    block_counter: u64,
    deferred_mode: bool,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<String>, silent: bool) {
        self.commands.push_back(DeferredCommand {
            command: command.into(),
            silent,
        });
    }

    pub fn front(&self) -> Option<&DeferredCommand> {
        self.commands.front()
    }

    pub fn pop_front(&mut self) -> Option<DeferredCommand> {
        self.commands.pop_front()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredCommand> {
        self.commands.iter()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Start a frame's drain.
    ///
    /// Returns `None` while a frame or time wait is pending, otherwise the
    /// block counter value the drain started with.
    pub fn begin_frame(&mut self, now: Duration) -> Option<u64> {
        if self.wait_frames > 0 {
            self.wait_frames -= 1;
            return None;
        }
        if let Some(until) = self.wait_until {
            if until > now {
                return None;
            }
            self.wait_until = None;
        }
        Some(self.block_counter)
    }

    /// Pause the drain for `frames` frames.
    pub fn set_wait_frames(&mut self, frames: i32) {
        self.wait_frames = frames.max(0) as u32;
    }

    pub fn wait_frames(&self) -> u32 {
        self.wait_frames
    }

    /// Pause the drain until `until`.
    pub fn set_wait_until(&mut self, until: Duration) {
        self.wait_until = Some(until);
    }

    pub fn wait_until(&self) -> Option<Duration> {
        self.wait_until
    }

    /// Bumped by every executed `BLOCKFRAME` command or variable.
    pub fn block_counter(&self) -> u64 {
        self.block_counter
    }

    pub(crate) fn bump_block_counter(&mut self) {
        self.block_counter = self.block_counter.wrapping_add(1);
    }

    pub fn deferred_mode(&self) -> bool {
        self.deferred_mode
    }

    pub fn set_deferred_mode(&mut self, on: bool) {
        self.deferred_mode = on;
    }
}
