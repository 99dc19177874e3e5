use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task. Closed set: every consumer matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
        TaskStatus::Cancelled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not started",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Cancelled => "Cancelled",
        }
    }
}

/// Represents the type of dependency between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    FinishToStart,
}

/// An ordering edge between two tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub src_task_id: Uuid,
    pub dst_task_id: Uuid,
    pub kind: DependencyKind,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dependency {
    pub fn new(project_id: Uuid, src_task_id: Uuid, dst_task_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            src_task_id,
            dst_task_id,
            kind: DependencyKind::FinishToStart,
            project_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when this edge joins the same two tasks, in either direction.
    pub fn links(&self, a: Uuid, b: Uuid) -> bool {
        (self.src_task_id == a && self.dst_task_id == b)
            || (self.src_task_id == b && self.dst_task_id == a)
    }
}

/// Payload of a dependency the engine asks the host to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDependency {
    pub id: Uuid,
    pub src_task_id: Uuid,
    pub dst_task_id: Uuid,
    pub kind: DependencyKind,
}

/// A schedulable item drawn as a note on a staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    /// Always at least one day.
    pub duration_days: u32,
    pub status: TaskStatus,
    pub staff_id: Uuid,
    /// Half-step position inside the staff: even values sit on a line, odd values in a space.
    pub staff_line: i32,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with sensible defaults.
    pub fn new(
        title: impl Into<String>,
        project_id: Uuid,
        staff_id: Uuid,
        start_date: NaiveDate,
        duration_days: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            start_date,
            duration_days: duration_days.max(1),
            status: TaskStatus::NotStarted,
            staff_id,
            staff_line: 0,
            assignee: None,
            description: None,
            project_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_line(mut self, staff_line: i32) -> Self {
        self.staff_line = staff_line;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Last day covered by the task (inclusive).
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + chrono::Duration::days(i64::from(self.duration_days.max(1)) - 1)
    }
}

/// Partial update emitted by a committed gesture. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub staff_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub staff_line: Option<i32>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.duration_days.is_none()
            && self.staff_id.is_none()
            && self.staff_line.is_none()
    }

    /// Apply the update in place; `duration_days` is floored at one day.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(days) = self.duration_days {
            task.duration_days = days.max(1);
        }
        if let Some(staff) = self.staff_id {
            task.staff_id = staff;
        }
        if let Some(line) = self.staff_line {
            task.staff_line = line;
        }
    }
}
