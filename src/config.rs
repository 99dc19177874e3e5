//! Engine configuration.
//!
//! Every tunable of the timeline lives in [`EngineConfig`]. Configs are
//! serialised as JSON with `#RRGGBB` / `#RRGGBBAA` colour strings so they can
//! be edited by hand.
//!
//! All structs carry `#[serde(default)]`, so a partial JSON file is valid:
//! missing keys fall back to the built-in defaults.

use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ZoomLimits;

const CONFIG_FILE_NAME: &str = "engine.json";

// ─── Hex-colour serde helper ────────────────────────────────────────────────

pub mod hex_color {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex(*color))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_color(&s).map_err(serde::de::Error::custom)
    }

    pub fn to_hex(color: Color32) -> String {
        let [r, g, b, a] = color.to_srgba_unmultiplied();
        if a == 255 {
            format!("#{:02X}{:02X}{:02X}", r, g, b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }

    pub fn parse_hex_color(s: &str) -> Result<Color32, String> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return Err(format!("Invalid hex color '{}': non-ASCII characters", s));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&s[range], 16).map_err(|e| e.to_string())
        };
        match s.len() {
            6 => Ok(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color32::from_rgba_unmultiplied(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(format!("Invalid hex color '{}': expected 6 or 8 hex digits", s)),
        }
    }
}

// ─── Top-level definition ───────────────────────────────────────────────────

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub left_margin: f32,
    pub top_margin: f32,
    /// Width of one day at zoom 1.
    pub day_width: f32,
    /// Vertical span of one staff, including the gap to the next one.
    pub staff_spacing: f32,
    /// Distance between two adjacent staff lines.
    pub staff_line_spacing: f32,
    /// Height of a task glyph.
    pub task_height: f32,
    pub start_padding: f32,
    pub gutter: f32,
    pub min_task_width: f32,
    /// Grab zone at the right edge of a glyph that starts a resize.
    pub resize_handle_px: f32,
    /// Maximum distance from a staff line for a drop to latch.
    pub snap_tolerance: f32,
    pub spatial_cell_size: f32,
    /// Multiplicative zoom per wheel notch.
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub min_vertical_scale: f32,
    pub max_vertical_scale: f32,
    pub show_labels: bool,
    /// Extra pixels generated past each side of the visible window.
    pub overscan: f32,
    pub measure: Option<MeasureConfig>,
    pub colors: EngineColors,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            left_margin: 120.0,
            top_margin: 64.0,
            day_width: 48.0,
            staff_spacing: 132.0,
            staff_line_spacing: 16.0,
            task_height: 16.0,
            start_padding: 2.0,
            gutter: 4.0,
            min_task_width: 16.0,
            resize_handle_px: 8.0,
            snap_tolerance: 24.0,
            spatial_cell_size: 200.0,
            zoom_step: 1.1,
            min_zoom: 0.05,
            max_zoom: 8.0,
            min_vertical_scale: 0.5,
            max_vertical_scale: 3.0,
            show_labels: true,
            overscan: 64.0,
            measure: Some(MeasureConfig::default()),
            colors: EngineColors::default(),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing keys use defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Save the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Parse { path: None, source })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `engine.json` inside the platform config directory, when one exists.
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "stave-timeline")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load the user config if present, falling back to defaults.
    pub fn load_user_or_default() -> Self {
        let Some(path) = Self::user_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded engine config");
                config
            }
            Err(err) => {
                tracing::warn!(%err, "falling back to default engine config");
                Self::default()
            }
        }
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            min_vertical_scale: self.min_vertical_scale,
            max_vertical_scale: self.max_vertical_scale,
        }
    }
}

// ─── Measures ───────────────────────────────────────────────────────────────

/// Bar lines drawn across the staffs every `length_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub length_days: u32,
    pub offset_days: i32,
    #[serde(with = "hex_color")]
    pub color: Color32,
    pub width: f32,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            length_days: 7,
            offset_days: 0,
            color: Color32::from_rgb(78, 84, 104),
            width: 1.5,
        }
    }
}

// ─── Colors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineColors {
    #[serde(with = "hex_color")]
    pub background: Color32,
    #[serde(with = "hex_color")]
    pub grid_minor: Color32,
    #[serde(with = "hex_color")]
    pub grid_major: Color32,
    #[serde(with = "hex_color")]
    pub staff_line: Color32,
    #[serde(with = "hex_color")]
    pub staff_label: Color32,
    #[serde(with = "hex_color")]
    pub date_label: Color32,
    #[serde(with = "hex_color")]
    pub dependency: Color32,
    #[serde(with = "hex_color")]
    pub dependency_preview: Color32,
    #[serde(with = "hex_color")]
    pub selection: Color32,
    #[serde(with = "hex_color")]
    pub today: Color32,
    #[serde(with = "hex_color")]
    pub ghost: Color32,
    #[serde(with = "hex_color")]
    pub invalid: Color32,
    #[serde(with = "hex_color")]
    pub tooltip_bg: Color32,
    #[serde(with = "hex_color")]
    pub tooltip_text: Color32,
    #[serde(with = "hex_color")]
    pub text_on_glyph: Color32,
}

impl Default for EngineColors {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(24, 24, 32),
            grid_minor: Color32::from_rgb(36, 38, 50),
            grid_major: Color32::from_rgb(50, 52, 64),
            staff_line: Color32::from_rgb(110, 116, 136),
            staff_label: Color32::from_rgb(162, 168, 186),
            date_label: Color32::from_rgb(155, 160, 178),
            dependency: Color32::from_rgb(150, 170, 210),
            dependency_preview: Color32::from_rgb(90, 140, 220),
            selection: Color32::from_rgb(90, 140, 220),
            today: Color32::from_rgb(240, 75, 75),
            ghost: Color32::from_rgba_unmultiplied(90, 140, 220, 110),
            invalid: Color32::from_rgba_unmultiplied(240, 75, 75, 140),
            tooltip_bg: Color32::from_rgb(34, 37, 48),
            tooltip_text: Color32::from_rgb(230, 232, 240),
            text_on_glyph: Color32::from_rgb(230, 232, 240),
        }
    }
}
