//! Logging bootstrap.
//!
//! The library only emits `tracing` events; binaries call [`init`] once to
//! install a formatting subscriber. Initialisation is idempotent and never panics.

use std::str::FromStr;
use std::sync::OnceLock;

use tracing::Level;

/// Environment variable holding the maximum level (`error`..`trace`).
pub const LOG_LEVEL_ENV: &str = "STAVE_LOG";

static INITIALIZED: OnceLock<Level> = OnceLock::new();

/// Install the fmt subscriber. Returns the active level.
///
/// A second call returns the level chosen by the first one. When another
/// subscriber is already installed the call is a no-op.
pub fn init() -> Level {
    *INITIALIZED.get_or_init(|| {
        let level = level_from_env();
        if let Err(err) = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .try_init()
        {
            eprintln!("logging already configured: {err}");
        }
        level
    })
}

fn level_from_env() -> Level {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(Level::INFO)
}

fn parse_level(raw: &str) -> Option<Level> {
    Level::from_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level(" warn "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn init_is_idempotent() {
        let first = init();
        assert_eq!(init(), first);
    }
}
