//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + API key):
//!   Linux:   ~/.config/poetry-printer/
//!   macOS:   ~/Library/Application Support/poetry-printer/
//!
//! Data dir (pictures + logs):
//!   Linux:   ~/.local/share/poetry-printer/
//!   macOS:   ~/Library/Application Support/poetry-printer/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `.api_key`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default location of the API key file.
    pub api_key_file: PathBuf,
    /// Directory where captured pictures are kept.
    pub pictures_dir: PathBuf,
    /// Human-readable process log (tee of stderr).
    pub log_file: PathBuf,
    /// One JSON line per pipeline run.
    pub run_log: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "poetry-printer";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (a bare service account without a home, for example).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let logs_dir = data_dir.join("logs");

        Self {
            settings_file: config_dir.join("settings.toml"),
            api_key_file: config_dir.join(".api_key"),
            config_dir,
            pictures_dir: data_dir.join("pictures"),
            log_file: logs_dir.join("poetry-printer.log"),
            run_log: logs_dir.join("runs.jsonl"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
