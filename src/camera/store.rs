//! Saving captured pictures for later inspection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// File name for a picture taken at `at`, e.g.
/// `poetry_picture_20261019-142501.jpg`.
pub fn picture_name(at: &DateTime<Local>) -> String {
    format!("poetry_picture_{}.jpg", at.format("%Y%m%d-%H%M%S"))
}

/// Write `bytes` into `dir` (created if needed) and return the file path.
///
/// Two pictures in the same second get a numeric suffix instead of
/// overwriting each other.
pub fn save_picture(dir: &Path, bytes: &[u8], at: &DateTime<Local>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let name = picture_name(at);
    let mut path = dir.join(&name);
    let mut n = 1;
    while path.exists() {
        let stem = name.trim_end_matches(".jpg");
        path = dir.join(format!("{stem}-{n}.jpg"));
        n += 1;
    }

    std::fs::write(&path, bytes)?;
    Ok(path)
}
