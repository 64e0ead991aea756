//! Dedicated OS-thread poller for the button pin.
//!
//! [`ButtonListener`] owns that thread and a stop flag; dropping it sets the
//! flag and joins the thread, which exits within one poll interval.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::{forward_press, ButtonEvent, Debouncer, InputError};
use crate::gpio::InputPin;
use crate::pipeline::SharedState;

// ---------------------------------------------------------------------------
// ButtonListener
// ---------------------------------------------------------------------------

/// Handle to a running button polling thread.
///
/// Construct one with [`ButtonListener::start`].  Drop it to stop polling.
pub struct ButtonListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ButtonListener {
    /// Spawn the polling thread.
    ///
    /// # Arguments
    ///
    /// * `pin`           — the button input.
    /// * `active_low`    — `true` when pressed reads as [`Level::Low`](crate::gpio::Level::Low).
    /// * `debouncer`     — debounce state machine, moved onto the thread.
    /// * `poll_interval` — delay between samples.
    /// * `state`         — read before every hand-off; presses are dropped
    ///   unless the pipeline is ready.
    /// * `tx`            — presses go here via `try_send`, so the thread never
    ///   blocks on a slow consumer.
    ///
    /// # Errors
    ///
    /// [`InputError::Spawn`] if the OS refuses to create the thread.
    pub fn start(
        mut pin: Box<dyn InputPin>,
        active_low: bool,
        mut debouncer: Debouncer,
        poll_interval: Duration,
        state: SharedState,
        tx: mpsc::Sender<ButtonEvent>,
    ) -> Result<Self, InputError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("button-listener".into())
            .spawn(move || {
                let mut faulted = false;

                while !stop_clone.load(Ordering::Relaxed) {
                    match pin.read() {
                        Ok(level) => {
                            if faulted {
                                log::info!("button: input recovered");
                                faulted = false;
                            }
                            let pressed = level.is_active(active_low);
                            if let Some(event) = debouncer.sample(pressed, Instant::now()) {
                                log::debug!("button: press #{} recognised", event.seq);
                                if !forward_press(&state, &tx, event) {
                                    log::info!("button: pipeline gone, listener exiting");
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            // Log once per fault streak; keep polling.
                            if !faulted {
                                log::error!("button: {}", InputError::from(e));
                                faulted = true;
                            }
                        }
                    }

                    std::thread::sleep(poll_interval);
                }
            })
            .map_err(InputError::Spawn)?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for ButtonListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
