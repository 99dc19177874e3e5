use egui::{Color32, FontId};
use egui_phosphor::regular as icons;

use crate::model::TaskStatus;

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const TODAY_BADGE_WIDTH: f32 = 42.0;
pub const TODAY_BADGE_HEIGHT: f32 = 14.0;
pub const TOOLTIP_GAP: f32 = 14.0;
pub const TOOLTIP_MAX_WIDTH: f32 = 280.0;
pub const TOOLTIP_PADDING: f32 = 8.0;
pub const ARROW_HEAD: f32 = 8.0;
pub const DROP_MARKER_RADIUS: f32 = 5.0;
pub const STEM_LENGTH: f32 = 22.0;
pub const HEADER_LABEL_Y: f32 = 18.0;
pub const SUBHEADER_LABEL_Y: f32 = 36.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_header() -> FontId {
    FontId::proportional(12.0)
}

pub fn font_sub() -> FontId {
    FontId::proportional(10.5)
}

pub fn font_glyph() -> FontId {
    FontId::proportional(11.0)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.5)
}

pub fn font_clef(staff_height: f32) -> FontId {
    FontId::proportional((staff_height * 0.9).clamp(12.0, 72.0))
}

pub fn font_code() -> FontId {
    FontId::monospace(11.0)
}

// ── Status palette ───────────────────────────────────────────────────────────

/// Fill colour and icon for a status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusStyle {
    pub fill: Color32,
    pub outline: Color32,
    pub icon: &'static str,
}

pub fn status_style(status: TaskStatus) -> StatusStyle {
    match status {
        TaskStatus::NotStarted => StatusStyle {
            fill: Color32::from_rgb(66, 133, 244),
            outline: Color32::from_rgb(40, 90, 170),
            icon: icons::CIRCLE,
        },
        TaskStatus::InProgress => StatusStyle {
            fill: Color32::from_rgb(251, 140, 0),
            outline: Color32::from_rgb(180, 96, 0),
            icon: icons::CIRCLE_HALF,
        },
        TaskStatus::Completed => StatusStyle {
            fill: Color32::from_rgb(52, 168, 83),
            outline: Color32::from_rgb(30, 116, 56),
            icon: icons::CHECK_CIRCLE,
        },
        TaskStatus::Blocked => StatusStyle {
            fill: Color32::from_rgb(229, 57, 53),
            outline: Color32::from_rgb(160, 32, 30),
            icon: icons::PROHIBIT,
        },
        TaskStatus::Cancelled => StatusStyle {
            fill: Color32::from_rgb(120, 124, 138),
            outline: Color32::from_rgb(84, 88, 100),
            icon: icons::X_CIRCLE,
        },
    }
}

// ── Clefs ────────────────────────────────────────────────────────────────────

/// Clef drawn at the head of a staff, chosen from the staff name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClefKind {
    Treble,
    Bass,
    Alto,
    Percussion,
}

impl ClefKind {
    pub fn for_staff_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("bass") || name.contains("low") {
            ClefKind::Bass
        } else if name.contains("alto") || name.contains("tenor") || name.contains("viola") {
            ClefKind::Alto
        } else if name.contains("perc") || name.contains("drum") || name.contains("rhythm") {
            ClefKind::Percussion
        } else {
            ClefKind::Treble
        }
    }

    /// Letter the clef is derived from. Percussion has none and is drawn as bars.
    pub fn letter(self) -> Option<&'static str> {
        match self {
            ClefKind::Treble => Some("G"),
            ClefKind::Bass => Some("F"),
            ClefKind::Alto => Some("C"),
            ClefKind::Percussion => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_distinct_fill() {
        let fills: Vec<Color32> = TaskStatus::ALL.iter().map(|s| status_style(*s).fill).collect();
        for (i, a) in fills.iter().enumerate() {
            for b in &fills[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn clef_follows_staff_name() {
        assert_eq!(ClefKind::for_staff_name("Bass line"), ClefKind::Bass);
        assert_eq!(ClefKind::for_staff_name("Viola section"), ClefKind::Alto);
        assert_eq!(ClefKind::for_staff_name("Drums"), ClefKind::Percussion);
        assert_eq!(ClefKind::for_staff_name("Design"), ClefKind::Treble);
        assert_eq!(ClefKind::Percussion.letter(), None);
    }
}
