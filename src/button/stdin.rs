//! Keyboard stand-in for the button, used by `--dry-run`.
//!
//! Every line read from stdin counts as one press.  No debouncing is needed;
//! the same ready gate as the GPIO listener applies.

use std::io::BufRead;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::{forward_press, ButtonEvent, InputError};
use crate::pipeline::SharedState;

/// Handle to the stdin reader thread.
///
/// The thread blocks in `read_line`, so it is never joined; it ends at EOF
/// or when the pipeline side of the channel is gone.
pub struct StdinTrigger {
    _thread: JoinHandle<()>,
}

impl StdinTrigger {
    pub fn start(state: SharedState, tx: mpsc::Sender<ButtonEvent>) -> Result<Self, InputError> {
        let thread = std::thread::Builder::new()
            .name("stdin-trigger".into())
            .spawn(move || {
                pump(std::io::stdin().lock(), &state, &tx);
                log::debug!("stdin-trigger: input closed");
            })
            .map_err(InputError::Spawn)?;

        Ok(Self { _thread: thread })
    }
}

/// Turn every line of `input` into a press until EOF, a read error, or the
/// receiver going away.  Returns the number of lines read.
fn pump(input: impl BufRead, state: &SharedState, tx: &mpsc::Sender<ButtonEvent>) -> u64 {
    let mut seq = 0;
    for line in input.lines() {
        if line.is_err() {
            break;
        }
        seq += 1;
        if !forward_press(state, tx, ButtonEvent::now(seq)) {
            break;
        }
    }
    seq
}
