//! Status LED in the button ring.
//!
//! | State                               | LED              |
//! |-------------------------------------|------------------|
//! | `Ready`                             | on               |
//! | `Capturing` `Generating` `Printing` | off              |
//! | `Error`                             | blinking         |
//!
//! [`StatusLed`] owns the output pin inside a tokio task and receives the
//! latest state over a `watch` channel.  [`StatusIndicator::set_state`] only
//! replaces the channel value, so the pipeline never waits on the pin and
//! never sees a pin error.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::gpio::{Level, OutputPin};
use crate::pipeline::PipelineState;

// ---------------------------------------------------------------------------
// StatusIndicator
// ---------------------------------------------------------------------------

/// Shows the pipeline state to the user.  Best effort, never blocks.
pub trait StatusIndicator: Send + Sync {
    fn set_state(&self, state: PipelineState);
}

/// Indicator for machines without an LED: state changes go to the log.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn set_state(&self, state: PipelineState) {
        log::info!("led: {}", describe(state));
    }
}

fn describe(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Ready => "on",
        PipelineState::Error => "blinking",
        _ => "off",
    }
}

// ---------------------------------------------------------------------------
// StatusLed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show(PipelineState),
    Off,
}

/// LED driven by a background task.
pub struct StatusLed {
    tx: watch::Sender<Command>,
    task: JoinHandle<()>,
}

impl StatusLed {
    /// Take ownership of `pin` and show `Ready`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(pin: Box<dyn OutputPin>, blink_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(Command::Show(PipelineState::Ready));
        let task = tokio::spawn(drive(pin, rx, blink_interval));
        Self { tx, task }
    }

    /// Switch the LED off and stop the task.
    pub async fn shutdown(self) {
        self.tx.send_replace(Command::Off);
        if let Err(e) = self.task.await {
            log::warn!("led: task ended abnormally: {e}");
        }
    }
}

impl StatusIndicator for StatusLed {
    fn set_state(&self, state: PipelineState) {
        self.tx.send_replace(Command::Show(state));
    }
}

/// Pin plus a latch so a broken pin is reported once, not on every write.
struct Driver {
    pin: Box<dyn OutputPin>,
    faulted: bool,
}

impl Driver {
    fn write(&mut self, level: Level) {
        match self.pin.write(level) {
            Ok(()) => {
                if self.faulted {
                    log::info!("led: pin writes work again");
                }
                self.faulted = false;
            }
            Err(e) => {
                if !self.faulted {
                    log::warn!("led: {e}");
                }
                self.faulted = true;
            }
        }
    }
}

async fn drive(pin: Box<dyn OutputPin>, mut rx: watch::Receiver<Command>, blink: Duration) {
    let mut driver = Driver {
        pin,
        faulted: false,
    };

    loop {
        let command = *rx.borrow_and_update();
        match command {
            Command::Off => {
                driver.write(Level::Low);
                return;
            }
            Command::Show(PipelineState::Error) => {
                let mut level = Level::High;
                loop {
                    driver.write(level);
                    level = match level {
                        Level::High => Level::Low,
                        Level::Low => Level::High,
                    };
                    tokio::select! {
                        changed = rx.changed() => {
                            if changed.is_err() {
                                driver.write(Level::Low);
                                return;
                            }
                            break;
                        }
                        _ = tokio::time::sleep(blink) => {}
                    }
                }
            }
            Command::Show(state) => {
                let level = if state == PipelineState::Ready {
                    Level::High
                } else {
                    Level::Low
                };
                driver.write(level);
                if rx.changed().await.is_err() {
                    driver.write(Level::Low);
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::GpioError;
    use std::sync::{Arc, Mutex};

    /// Records every level written.
    #[derive(Clone, Default)]
    struct RecordingPin {
        writes: Arc<Mutex<Vec<Level>>>,
        fail: bool,
    }

    impl RecordingPin {
        fn last(&self) -> Option<Level> {
            self.writes.lock().unwrap().last().copied()
        }

        fn count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl OutputPin for RecordingPin {
        fn write(&mut self, level: Level) -> Result<(), GpioError> {
            self.writes.lock().unwrap().push(level);
            if self.fail {
                Err(GpioError::InvalidValue {
                    pin: 18,
                    value: "test".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    #[tokio::test]
    async fn ready_is_on_and_busy_is_off() {
        let pin = RecordingPin::default();
        let led = StatusLed::start(Box::new(pin.clone()), Duration::from_millis(10));

        settle().await;
        assert_eq!(pin.last(), Some(Level::High));

        led.set_state(PipelineState::Generating);
        settle().await;
        assert_eq!(pin.last(), Some(Level::Low));

        led.set_state(PipelineState::Ready);
        settle().await;
        assert_eq!(pin.last(), Some(Level::High));

        led.shutdown().await;
    }

    #[tokio::test]
    async fn error_blinks_until_the_next_state() {
        let pin = RecordingPin::default();
        let led = StatusLed::start(Box::new(pin.clone()), Duration::from_millis(5));
        settle().await;

        let before = pin.count();
        led.set_state(PipelineState::Error);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let writes = pin.writes.lock().unwrap()[before..].to_vec();
        assert!(writes.len() >= 4, "only {} writes while blinking", writes.len());
        assert!(writes.contains(&Level::High) && writes.contains(&Level::Low));

        led.set_state(PipelineState::Ready);
        settle().await;
        let settled = pin.count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pin.count(), settled, "still blinking after leaving Error");
        assert_eq!(pin.last(), Some(Level::High));

        led.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_turns_the_led_off() {
        let pin = RecordingPin::default();
        let led = StatusLed::start(Box::new(pin.clone()), Duration::from_millis(10));
        settle().await;

        led.shutdown().await;
        assert_eq!(pin.last(), Some(Level::Low));
    }

    #[tokio::test]
    async fn failing_pin_does_not_stop_the_task() {
        let pin = RecordingPin {
            fail: true,
            ..RecordingPin::default()
        };
        let led = StatusLed::start(Box::new(pin.clone()), Duration::from_millis(10));
        settle().await;

        led.set_state(PipelineState::Capturing);
        settle().await;
        led.set_state(PipelineState::Ready);
        settle().await;

        assert!(pin.count() >= 3);
        led.shutdown().await;
    }

    #[test]
    fn log_indicator_accepts_every_state() {
        let indicator = LogIndicator;
        for s in [
            PipelineState::Ready,
            PipelineState::Capturing,
            PipelineState::Error,
        ] {
            indicator.set_state(s);
        }
        assert_eq!(describe(PipelineState::Printing), "off");
    }
}
