use std::path::PathBuf;

use thiserror::Error;

/// Failures the engine reports to its host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The rendering surface could not be created or has unusable metrics.
    /// Hosts are expected to show a fallback message instead of the timeline.
    #[error("renderer unavailable: {reason}")]
    RendererUnavailable { reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn renderer_unavailable(reason: impl Into<String>) -> Self {
        Self::RendererUnavailable {
            reason: reason.into(),
        }
    }

    pub fn is_renderer_unavailable(&self) -> bool {
        matches!(self, Self::RendererUnavailable { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config{}: {source}", path.as_ref().map(|p| format!(" in `{}`", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
}
