//! Host capabilities the console depends on.
//!
//! The console never asks the environment directly whether it runs in dev or
//! editor mode, what time it is, or how to abort. A [`ConsoleHost`] supplied at
//! construction answers those questions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bevy::prelude::*;

/// Privileges derived from the host mode, used by the mutation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMode {
    pub dev_mode: bool,
    pub editor: bool,
}

impl AccessMode {
    /// Release build, no editor.
    pub const RELEASE: Self = Self {
        dev_mode: false,
        editor: false,
    };

    /// Development build, no editor.
    pub const DEV: Self = Self {
        dev_mode: true,
        editor: false,
    };
}

/// Environment queries the console needs.
pub trait ConsoleHost: Send + Sync {
    /// Development build or dev-mode switch.
    fn is_dev_mode(&self) -> bool;

    /// Running inside an editor.
    fn is_editor(&self) -> bool;

    /// Start time of the current frame.
    fn now(&self) -> Duration;

    /// Abort the process with a message.
    fn fatal(&self, message: &str) {
        error!("{}", message);
        std::process::exit(1);
    }

    fn access_mode(&self) -> AccessMode {
        AccessMode {
            dev_mode: self.is_dev_mode(),
            editor: self.is_editor(),
        }
    }
}

/// Shared frame-start clock.
///
/// Cloning shares the underlying counter, so the plugin can advance the time a
/// host reports without reaching into the console.
#[derive(Resource, Debug, Clone, Default)]
pub struct FrameClock(Arc<AtomicU64>);

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.0.store(now.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn advance(&self, delta: Duration) {
        self.0.fetch_add(delta.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.0.load(Ordering::Relaxed))
    }
}

/// Host with fixed mode switches and a [`FrameClock`].
#[derive(Debug, Clone, Default)]
pub struct DefaultHost {
    pub dev_mode: bool,
    pub editor: bool,
    clock: FrameClock,
}

impl DefaultHost {
    pub fn new(dev_mode: bool, editor: bool) -> Self {
        Self {
            dev_mode,
            editor,
            clock: FrameClock::new(),
        }
    }

    /// Use an existing clock, typically one that a system keeps in sync with `Time`.
    pub fn with_clock(mut self, clock: FrameClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}

impl ConsoleHost for DefaultHost {
    fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    fn is_editor(&self) -> bool {
        self.editor
    }

    fn now(&self) -> Duration {
        self.clock.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_clock() {
        let clock = FrameClock::new();
        let host = DefaultHost::new(false, false).with_clock(clock.clone());

        assert_eq!(host.now(), Duration::ZERO);
        clock.set(Duration::from_millis(1500));
        assert_eq!(host.now(), Duration::from_millis(1500));
        clock.advance(Duration::from_millis(500));
        assert_eq!(host.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_access_mode() {
        assert_eq!(DefaultHost::new(true, false).access_mode(), AccessMode::DEV);
        assert_eq!(DefaultHost::new(false, false).access_mode(), AccessMode::RELEASE);
        assert!(DefaultHost::new(false, true).access_mode().editor);
    }
}
