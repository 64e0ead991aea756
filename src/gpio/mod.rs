//! Minimal GPIO abstraction for one button input and one LED output.
//!
//! The pipeline only ever needs to read a level or drive a level, so the
//! traits stay that small.  [`SysfsPin`] is the Linux implementation; tests
//! substitute in-memory pins.

pub mod sysfs;

pub use sysfs::SysfsPin;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Whether this level means "pressed" for a button wired with the given
    /// polarity.
    ///
    /// ```
    /// use poetry_printer::gpio::Level;
    ///
    /// assert!(Level::Low.is_active(true));
    /// assert!(!Level::High.is_active(true));
    /// assert!(Level::High.is_active(false));
    /// ```
    pub fn is_active(self, active_low: bool) -> bool {
        match self {
            Level::Low => active_low,
            Level::High => !active_low,
        }
    }
}

// ---------------------------------------------------------------------------
// GpioError
// ---------------------------------------------------------------------------

/// Errors raised while talking to a GPIO line.
#[derive(Debug, Error)]
pub enum GpioError {
    /// Exporting or configuring the pin failed.
    #[error("cannot set up GPIO {pin}: {source}")]
    Setup {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the pin value failed.
    #[error("GPIO {pin} I/O failed: {source}")]
    Io {
        pin: u32,
        #[source]
        source: std::io::Error,
    },

    /// The value file held something other than `0` or `1`.
    #[error("GPIO {pin} returned unexpected value {value:?}")]
    InvalidValue { pin: u32, value: String },
}

// ---------------------------------------------------------------------------
// Pin traits
// ---------------------------------------------------------------------------

/// A pin that can be sampled.
pub trait InputPin: Send {
    fn read(&mut self) -> Result<Level, GpioError>;
}

/// A pin that can be driven.
pub trait OutputPin: Send {
    fn write(&mut self, level: Level) -> Result<(), GpioError>;
}
