//! One JSON line per pipeline run.
//!
//! The run log is for people reading it after the fact.  Nothing in the
//! appliance reads it back, and failing to write it never fails a run.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::Stage;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Printed,
    Failed,
}

/// A single line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run counter since process start.
    pub run: u64,
    /// Press number reported by the input side.
    pub press: u64,
    pub started_at: DateTime<Local>,
    pub duration_ms: u64,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Append-only JSON lines file.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, creating the file and its directory on first use.
    pub fn append(&self, record: &RunRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(run: u64, outcome: Outcome) -> RunRecord {
        RunRecord {
            run,
            press: run,
            started_at: Local::now(),
            duration_ms: 1234,
            outcome,
            stage: (outcome == Outcome::Failed).then_some(Stage::Generate),
            reason: (outcome == Outcome::Failed).then(|| "gave up after 3 attempts".to_string()),
            image: None,
            title: None,
        }
    }

    #[test]
    fn records_are_appended_as_json_lines() {
        let dir = tempdir().expect("temp dir");
        let log = RunLog::new(dir.path().join("logs/runs.jsonl"));

        log.append(&record(1, Outcome::Printed)).unwrap();
        log.append(&record(2, Outcome::Failed)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: RunRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.outcome, Outcome::Printed);
        assert!(first.stage.is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["outcome"], "failed");
        assert_eq!(second["stage"], "generate");
        assert_eq!(second["run"], 2);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let json = serde_json::to_string(&record(1, Outcome::Printed)).unwrap();
        assert!(!json.contains("reason"));
        assert!(!json.contains("image"));
    }
}
