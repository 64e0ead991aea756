//! Poetry printer: press the button, get a poem about what the camera sees.
//!
//! A debounced button press starts one pipeline run: the camera takes a
//! picture, a remote model writes a short poem about it, and a thermal
//! receipt printer prints the result.  The ring LED shows whether the
//! appliance is ready, busy or recovering from an error.
//!
//! | Module       | Role                                                   |
//! |--------------|--------------------------------------------------------|
//! | [`config`]   | TOML settings, paths, API key lookup                   |
//! | [`logging`]  | `env_logger` setup with a log-file tee                 |
//! | [`gpio`]     | Pin traits and the sysfs implementation                |
//! | [`button`]   | Debouncer, polling thread, stdin trigger               |
//! | [`camera`]   | Still capture through `rpicam-still`                   |
//! | [`poem`]     | Request building, response parsing, retries            |
//! | [`printer`]  | ESC/POS layout and serial output                       |
//! | [`led`]      | Status LED patterns                                    |
//! | [`pipeline`] | State machine, orchestrator, run log                   |

pub mod button;
pub mod camera;
pub mod config;
pub mod gpio;
pub mod led;
pub mod logging;
pub mod pipeline;
pub mod poem;
pub mod printer;
