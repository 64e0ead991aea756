//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted for the generation-service key.
pub const API_KEY_ENV: &str = "POETRY_PRINTER_API_KEY";

// ---------------------------------------------------------------------------
// ButtonConfig
// ---------------------------------------------------------------------------

/// Push button wiring and debounce timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// BCM pin number of the button input.
    pub pin: u32,
    /// `true` when the button pulls the line to ground (pressed = LOW).
    pub active_low: bool,
    /// How often the pin level is sampled.
    pub poll_interval_ms: u64,
    /// How long the level must stay pressed before a press is recognised.
    pub stable_ms: u64,
    /// Cooldown after a recognised press during which edges are ignored.
    pub refractory_ms: u64,
    /// Root of the sysfs GPIO tree.
    pub gpio_root: PathBuf,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pin: 23,
            active_low: true,
            poll_interval_ms: 10,
            stable_ms: 50,
            refractory_ms: 1000,
            gpio_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

// ---------------------------------------------------------------------------
// LedConfig
// ---------------------------------------------------------------------------

/// Ring LED on the button.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    /// BCM pin number of the LED output.
    pub pin: u32,
    /// Half-period of the error blink pattern.
    pub blink_interval_ms: u64,
    /// How long the error pattern stays visible before returning to ready.
    pub error_hold_ms: u64,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            pin: 18,
            blink_interval_ms: 250,
            error_hold_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Still-capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Still-capture program (`rpicam-still`, `libcamera-still`, …).
    pub command: String,
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Sensor warm-up before the frame is taken.
    pub warmup_ms: u64,
    /// Upper bound for one capture, warm-up included.
    pub timeout_secs: u64,
    /// Keep a copy of every captured picture.
    pub save_images: bool,
    /// Where pictures are kept; `None` means [`AppPaths::pictures_dir`].
    pub save_dir: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: "rpicam-still".into(),
            width: 2592,
            height: 1944,
            warmup_ms: 1000,
            timeout_secs: 10,
            save_images: true,
            save_dir: None,
        }
    }
}

impl CameraConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory for saved pictures, or `None` when saving is disabled.
    pub fn resolved_save_dir(&self) -> Option<PathBuf> {
        if !self.save_images {
            return None;
        }
        Some(
            self.save_dir
                .clone()
                .unwrap_or_else(|| AppPaths::new().pictures_dir),
        )
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

/// Remote poem-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the generation API (no trailing slash).
    pub base_url: String,
    /// Model identifier placed in the request path.
    pub model: String,
    /// Instruction sent alongside the picture.
    pub prompt: String,
    /// API key given inline.  Prefer the environment or the key file.
    pub api_key: Option<String>,
    /// File whose first line is the API key; `None` means
    /// [`AppPaths::api_key_file`].
    pub api_key_file: Option<PathBuf>,
    /// Upper bound for a single request attempt.
    pub timeout_secs: u64,
    /// Total attempts per press, first try included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Delay growth factor between retries.
    pub backoff_multiplier: f64,
    /// Cap on the delay between retries.
    pub max_backoff_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash".into(),
            prompt: "Write a Haiku about the scene in this picture.".into(),
            api_key: None,
            api_key_file: None,
            timeout_secs: 30,
            max_attempts: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_backoff_ms: 4000,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the API key: inline value, then [`API_KEY_ENV`], then the
    /// first line of the key file.
    ///
    /// # Errors
    ///
    /// Fails when none of the sources yields a non-empty key.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        let path = self
            .api_key_file
            .clone()
            .unwrap_or_else(|| AppPaths::new().api_key_file);
        Self::read_key_file(&path)
    }

    fn read_key_file(path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "API key not configured: set {API_KEY_ENV} or create {}",
                path.display()
            )
        })?;
        let key = content.lines().next().unwrap_or("").trim();
        if key.is_empty() {
            bail!("API key file {} is empty", path.display());
        }
        Ok(key.to_string())
    }
}

// ---------------------------------------------------------------------------
// PrinterConfig
// ---------------------------------------------------------------------------

/// Serial thermal printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Serial device the printer is attached to.
    pub device: PathBuf,
    /// Baud rate applied with `stty` at startup; `0` leaves the port alone.
    pub baud_rate: u32,
    /// Characters per line in the default font.
    pub columns: usize,
    /// Blank lines fed after the body so the text clears the tear bar.
    pub feed_lines: u8,
    /// Send a cut command after each job.
    pub cut: bool,
    /// Upper bound for writing one job.
    pub write_timeout_secs: u64,
    /// Print a short notice when a run fails.
    pub error_slip: bool,
    /// Print a dashed rule under the poem.
    pub separator: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/serial0"),
            baud_rate: 9600,
            columns: 32,
            feed_lines: 3,
            cut: true,
            write_timeout_secs: 5,
            error_slip: true,
            separator: true,
        }
    }
}

impl PrinterConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// The rate to configure, if any.
    pub fn baud(&self) -> Option<u32> {
        (self.baud_rate != 0).then_some(self.baud_rate)
    }
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

/// Process log and run log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Process log file; `None` means [`AppPaths::log_file`].
    pub file: Option<PathBuf>,
    /// Disable the process log file and write to stderr only.
    pub stderr_only: bool,
    /// Per-run JSON lines; `None` means [`AppPaths::run_log`].
    pub run_log: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
            stderr_only: false,
            run_log: None,
        }
    }
}

impl LogConfig {
    pub fn resolved_file(&self) -> Option<PathBuf> {
        if self.stderr_only {
            return None;
        }
        Some(self.file.clone().unwrap_or_else(|| AppPaths::new().log_file))
    }

    pub fn resolved_run_log(&self) -> PathBuf {
        self.run_log
            .clone()
            .unwrap_or_else(|| AppPaths::new().run_log)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use poetry_printer::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.printer.columns, 32);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub button: ButtonConfig,
    pub led: LedConfig,
    pub camera: CameraConfig,
    pub generator: GeneratorConfig,
    pub printer: PrinterConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so a fresh install runs with the stock wiring.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
