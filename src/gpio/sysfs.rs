//! GPIO through the sysfs interface (`/sys/class/gpio`).
//!
//! Setting up a pin writes its number to `export`, waits for the kernel to
//! create `gpioN/`, then writes the direction.  Sysfs cannot enable the
//! internal pull-up, so the button line relies on the pull configured in
//! `config.txt` or an external resistor.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{GpioError, InputPin, Level, OutputPin};

/// How long to wait for udev to make a freshly exported pin writable.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

/// A single exported GPIO line.
#[derive(Debug)]
pub struct SysfsPin {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export `pin` under `root` and configure it as an input.
    pub fn input(root: &Path, pin: u32) -> Result<Self, GpioError> {
        Self::open(root, pin, "in")
    }

    /// Export `pin` under `root` and configure it as an output driven low.
    pub fn output(root: &Path, pin: u32) -> Result<Self, GpioError> {
        // "low" sets direction and initial level in one write.
        Self::open(root, pin, "low")
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn open(root: &Path, pin: u32, direction: &str) -> Result<Self, GpioError> {
        let setup = |source| GpioError::Setup { pin, source };
        let pin_dir = root.join(format!("gpio{pin}"));

        if !pin_dir.exists() {
            fs::write(root.join("export"), pin.to_string()).map_err(setup)?;
            std::thread::sleep(EXPORT_SETTLE);
        }

        fs::write(pin_dir.join("direction"), direction).map_err(setup)?;

        Ok(Self {
            pin,
            value_path: pin_dir.join("value"),
        })
    }
}

impl InputPin for SysfsPin {
    fn read(&mut self) -> Result<Level, GpioError> {
        let raw = fs::read_to_string(&self.value_path).map_err(|source| GpioError::Io {
            pin: self.pin,
            source,
        })?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(GpioError::InvalidValue {
                pin: self.pin,
                value: other.to_string(),
            }),
        }
    }
}

impl OutputPin for SysfsPin {
    fn write(&mut self, level: Level) -> Result<(), GpioError> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        fs::write(&self.value_path, value).map_err(|source| GpioError::Io {
            pin: self.pin,
            source,
        })
    }
}
