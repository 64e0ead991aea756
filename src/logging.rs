//! Process logging: `log` facade, `env_logger` backend.
//!
//! `RUST_LOG` wins over the configured level.  With a log file configured,
//! every record goes to stderr and is appended to the file as well, so a
//! supervisor that discards stderr still leaves a trail on disk.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Env, Target, WriteStyle};

use crate::config::LogConfig;

/// Writes everything to stderr and to an append-mode file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr is best effort, the file is the record.
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the global logger.
///
/// # Errors
///
/// Fails when the log file cannot be opened.  A logger that was already
/// installed (tests, repeated calls) is left in place.
pub fn init(config: &LogConfig) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(config.level.as_str()));

    let file = config.resolved_file();
    if let Some(path) = &file {
        let tee = Tee {
            file: open_append(path)?,
        };
        builder
            .target(Target::Pipe(Box::new(tee)))
            .write_style(WriteStyle::Never);
    }

    if builder.try_init().is_ok() {
        if let Some(path) = file {
            log::debug!("logging to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tee_appends_to_the_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("logs/poetry-printer.log");

        {
            let mut tee = Tee {
                file: open_append(&path).unwrap(),
            };
            tee.write_all(b"first\n").unwrap();
            tee.flush().unwrap();
        }
        {
            let mut tee = Tee {
                file: open_append(&path).unwrap(),
            };
            tee.write_all(b"second\n").unwrap();
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        assert!(open_append(&blocker.join("app.log")).is_err());
    }
}
