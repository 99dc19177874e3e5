//! Staff-notation timeline: tasks drawn as note glyphs on staff lines, with
//! pan, zoom and direct manipulation through an egui-based engine.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod render;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError};
pub use render::{EngineIntent, FrameSnapshot, TimelineEngine, TimelineHost};
