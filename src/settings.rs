//! Settings infrastructure for openapi-lsp.
//!
//! This module loads `openapi-lsp.toml`, discovered by walking up from a
//! starting directory, and turns it into the server's logging configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name searched for during settings discovery.
pub const SETTINGS_FILE: &str = "openapi-lsp.toml";

/// Filter used when neither `RUST_LOG` nor the settings file set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Root settings structure loaded from `openapi-lsp.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Logging configuration.
    pub log: Option<LogSettings>,
}

/// Logging settings.
#[derive(Debug, Default, Deserialize)]
pub struct LogSettings {
    /// A `tracing` filter directive, e.g. `"debug"` or `"openapi_lsp=trace"`.
    pub level: Option<String>,
}

impl Settings {
    /// The configured log filter, or [`DEFAULT_LOG_LEVEL`].
    pub fn log_level(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|log| log.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Load settings from a file, falling back to defaults if it is missing or
/// malformed.
///
/// Logging is not set up yet when this runs, so problems go to stderr.
pub fn load_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Find and load the nearest settings file.
///
/// Walks up from `start_dir`, then checks its immediate child directories.
/// Returns the settings and the directory they were found in.
///
/// Callers pass the process working directory: the settings configure
/// logging, which is set up before `initialize` reports a workspace root.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}
