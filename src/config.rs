//! Look of the egui console window.

use bevy::prelude::*;
use bevy_egui::egui::{self, Color32, FontId, TextFormat};

use crate::core::ConsoleOutputLevel;

/// Console window settings.
#[derive(Resource, Reflect, Clone)]
#[reflect(Resource)]
pub struct ConsoleConfig {
    pub title: String,
    pub default_width: f32,
    pub default_height: f32,
    /// Hide `Debug` lines in the scrollback.
    pub hide_debug: bool,
    #[reflect(ignore)]
    pub theme: ConsoleTheme,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            title: "Console".to_string(),
            default_width: 900.0,
            default_height: 400.0,
            hide_debug: false,
            theme: ConsoleTheme::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConsoleTheme {
    pub font: FontId,
    pub text: Color32,
    pub dark: Color32,
    pub debug: Color32,
    pub warn: Color32,
    pub error: Color32,
    pub command: Color32,
    pub result: Color32,
}

impl Default for ConsoleTheme {
    fn default() -> Self {
        Self {
            font: FontId::monospace(14.0),
            text: Color32::from_gray(220),
            dark: Color32::from_gray(120),
            debug: Color32::from_gray(150),
            warn: Color32::from_rgb(230, 200, 60),
            error: Color32::from_rgb(235, 90, 80),
            command: Color32::from_rgb(110, 190, 230),
            result: Color32::from_rgb(130, 210, 120),
        }
    }
}

impl ConsoleTheme {
    fn format(&self, color: Color32) -> TextFormat {
        TextFormat::simple(self.font.clone(), color)
    }

    pub fn format_text(&self) -> TextFormat {
        self.format(self.text)
    }

    pub fn format_dark(&self) -> TextFormat {
        self.format(self.dark)
    }

    pub fn format_bold(&self) -> TextFormat {
        TextFormat {
            underline: egui::Stroke::new(1.0, self.text),
            ..self.format(Color32::WHITE)
        }
    }

    pub fn color(&self, level: ConsoleOutputLevel) -> Color32 {
        match level {
            ConsoleOutputLevel::Debug => self.debug,
            ConsoleOutputLevel::Info => self.text,
            ConsoleOutputLevel::Warn => self.warn,
            ConsoleOutputLevel::Error => self.error,
            ConsoleOutputLevel::Command => self.command,
            ConsoleOutputLevel::Result => self.result,
        }
    }

    pub fn format_level(&self, level: ConsoleOutputLevel) -> TextFormat {
        self.format(self.color(level))
    }
}
