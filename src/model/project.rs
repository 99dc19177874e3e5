use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::staff::Staff;
use super::task::{Dependency, NewDependency, Task, TaskUpdate};

/// In-memory project: the tasks, dependencies and staffs a host feeds the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    /// Day zero of the timeline.
    pub epoch: NaiveDate,
    pub tasks: HashMap<Uuid, Task>,
    pub dependencies: HashMap<Uuid, Dependency>,
    pub staffs: Vec<Staff>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Untitled Project".to_string(),
            epoch: Utc::now().date_naive(),
            tasks: HashMap::new(),
            dependencies: HashMap::new(),
            staffs: Vec::new(),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }
}

impl Project {
    pub fn new(name: impl Into<String>, epoch: NaiveDate) -> Self {
        Self {
            name: name.into(),
            epoch,
            ..Default::default()
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    pub fn add_staff(&mut self, staff: Staff) -> Uuid {
        let id = staff.id;
        self.staffs.push(staff);
        self.touch();
        id
    }

    pub fn add_task(&mut self, mut task: Task) -> Uuid {
        task.project_id = self.id;
        let id = task.id;
        self.tasks.insert(id, task);
        self.touch();
        id
    }

    /// Apply a partial update. Returns `false` when the task no longer exists.
    pub fn apply_update(&mut self, task_id: Uuid, update: &TaskUpdate) -> bool {
        let Some(task) = self.tasks.get_mut(&task_id) else {
            return false;
        };
        update.apply_to(task);
        if let Some(staff) = self.staffs.iter().find(|s| s.id == task.staff_id) {
            task.staff_line = staff.clamp_line(task.staff_line);
        }
        task.updated_at = Utc::now();
        self.touch();
        true
    }

    /// Insert a dependency unless the two tasks are already linked or missing.
    pub fn add_dependency(&mut self, dep: &NewDependency) -> bool {
        if dep.src_task_id == dep.dst_task_id
            || !self.tasks.contains_key(&dep.src_task_id)
            || !self.tasks.contains_key(&dep.dst_task_id)
        {
            return false;
        }
        let exists = self
            .dependencies
            .values()
            .any(|d| d.links(dep.src_task_id, dep.dst_task_id));
        if exists {
            return false;
        }
        let now = Utc::now();
        self.dependencies.insert(
            dep.id,
            Dependency {
                id: dep.id,
                src_task_id: dep.src_task_id,
                dst_task_id: dep.dst_task_id,
                kind: dep.kind,
                project_id: self.id,
                created_at: now,
                updated_at: now,
            },
        );
        self.touch();
        true
    }

    /// Remove a task and every dependency touching it.
    pub fn delete_task(&mut self, id: Uuid) {
        self.tasks.remove(&id);
        self.dependencies
            .retain(|_, d| d.src_task_id != id && d.dst_task_id != id);
        self.touch();
    }
}
