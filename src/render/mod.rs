pub mod controller;
pub mod engine;
pub mod layout;
pub mod markup;
pub mod scene;
pub mod spatial;
pub mod theme;

pub use controller::{EngineIntent, GestureController, GesturePreview, GestureState};
pub use engine::{DebugEvent, FrameSnapshot, FrameStats, TimelineEngine, TimelineHost};
pub use layout::{LayoutMetrics, TaskAnchors, TaskLayout, TimeScale};
pub use scene::SceneManager;
pub use spatial::SpatialIndex;
