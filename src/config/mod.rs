//! Configuration module for the poetry printer.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each piece of
//! hardware, `AppPaths` for data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ButtonConfig, CameraConfig, GeneratorConfig, LedConfig, LogConfig, PrinterConfig,
    API_KEY_ENV,
};
