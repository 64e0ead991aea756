//! Stand-in printer for dry runs: shows each job on stdout.

use async_trait::async_trait;

use super::{PrintError, PrintJob, Printer};

/// Writes the printable text of every job to stdout between two rules.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrinter;

impl ConsolePrinter {
    pub fn new() -> Self {
        Self
    }

    /// The framed text that [`print`](Printer::print) writes.
    pub fn render(job: &PrintJob) -> String {
        let width = job
            .title
            .iter()
            .chain(&job.lines)
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);
        let rule = "=".repeat(width);
        let body = job.preview();
        format!("{rule}\n{}\n{rule}", body.trim_end_matches('\n'))
    }
}

#[async_trait]
impl Printer for ConsolePrinter {
    async fn print(&self, job: &PrintJob) -> Result<(), PrintError> {
        println!("{}", Self::render(job));
        Ok(())
    }
}
