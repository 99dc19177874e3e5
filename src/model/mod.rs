pub mod project;
pub mod staff;
pub mod task;
pub mod viewport;

pub use project::Project;
pub use staff::{ordered_staffs, Staff};
pub use task::{Dependency, DependencyKind, NewDependency, Task, TaskStatus, TaskUpdate};
pub use viewport::{Viewport, ZoomLimits};
