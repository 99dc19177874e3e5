use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named lane made of horizontal lines, like a musical staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    /// At least one line.
    pub number_of_lines: u32,
    /// Cosmetic; layout uses the configured staff-line spacing.
    pub line_spacing: f32,
    /// Vertical stacking order, lowest first.
    pub position: i32,
    #[serde(default)]
    pub time_signature: Option<String>,
}

impl Staff {
    pub fn new(name: impl Into<String>, number_of_lines: u32, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            number_of_lines: number_of_lines.max(1),
            line_spacing: 16.0,
            position,
            time_signature: None,
        }
    }

    /// Highest valid half-step index: `(lines - 1) * 2`.
    pub fn max_half_step(&self) -> i32 {
        (self.number_of_lines.max(1) as i32 - 1) * 2
    }

    pub fn clamp_line(&self, staff_line: i32) -> i32 {
        staff_line.clamp(0, self.max_half_step())
    }
}

/// Staffs sorted top to bottom by `position`. Equal positions keep input order.
pub fn ordered_staffs(staffs: &[Staff]) -> Vec<&Staff> {
    let mut ordered: Vec<&Staff> = staffs.iter().collect();
    ordered.sort_by_key(|s| s.position);
    ordered
}
