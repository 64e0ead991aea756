//! Receipt layout: word wrapping and [`PrintJob`] assembly.
//!
//! Wrapping rules:
//!
//! * Line breaks in the source text are kept; blank lines stay blank.
//! * A line that already fits is printed as is (trailing spaces dropped).
//! * A longer line is filled greedily, breaking only between words.
//! * A single word wider than the paper is cut into width-sized pieces.
//!   This is the only case in which a word is split.
//!
//! Because a fitting line is never touched, wrapping already wrapped text
//! returns it unchanged.

use chrono::{DateTime, Local};

use crate::config::PrinterConfig;
use crate::pipeline::Stage;
use crate::poem::Poem;

use super::escpos::{self, Align};

// ---------------------------------------------------------------------------
// Wrapping
// ---------------------------------------------------------------------------

/// Wrap one source line to `width` columns.
///
/// ```
/// use poetry_printer::printer::wrap_line;
///
/// assert_eq!(
///     wrap_line("an old silent pond a frog jumps in", 16),
///     vec!["an old silent", "pond a frog", "jumps in"]
/// );
/// ```
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let line = line.trim_end();
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(width).map(|c| c.iter().collect::<String>());
            let mut last = pieces.next().unwrap_or_default();
            for piece in pieces {
                out.push(std::mem::replace(&mut last, piece));
            }
            current_len = last.chars().count();
            current = last;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            out.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Wrap every line of `text`, keeping explicit line breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    text.lines().flat_map(|line| wrap_line(line, width)).collect()
}

// ---------------------------------------------------------------------------
// PrintJob
// ---------------------------------------------------------------------------

/// A fully laid-out receipt.  Consumed once by a [`Printer`](super::Printer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    /// Already wrapped heading lines, printed centred and bold.
    pub title: Vec<String>,
    /// Already wrapped body lines, printed left-aligned.
    pub lines: Vec<String>,
    /// Lines fed after the body.
    pub feed_lines: u8,
    /// Cut the paper at the end.
    pub cut: bool,
}

impl PrintJob {
    /// Encode the job as an ESC/POS byte stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = escpos::init();

        if !self.title.is_empty() {
            out.extend(escpos::align(Align::Center));
            out.extend(escpos::emphasis(true));
            for line in &self.title {
                out.extend(escpos::text_line(line));
            }
            out.extend(escpos::emphasis(false));
            out.extend(escpos::text_line(""));
        }

        out.extend(escpos::align(Align::Left));
        for line in &self.lines {
            out.extend(escpos::text_line(line));
        }

        out.extend(escpos::feed(self.feed_lines));
        if self.cut {
            out.extend(escpos::cut());
        }
        out
    }

    /// The text as it will appear on paper, without commands.
    pub fn preview(&self) -> String {
        escpos::strip_commands(&self.to_bytes())
    }
}

// ---------------------------------------------------------------------------
// ReceiptFormatter
// ---------------------------------------------------------------------------

/// Lays poems and notices out for a fixed-width roll.
#[derive(Debug, Clone)]
pub struct ReceiptFormatter {
    columns: usize,
    feed_lines: u8,
    cut: bool,
    separator: bool,
}

impl Default for ReceiptFormatter {
    fn default() -> Self {
        Self::from_config(&PrinterConfig::default())
    }
}

impl ReceiptFormatter {
    pub fn from_config(config: &PrinterConfig) -> Self {
        Self {
            columns: config.columns.max(1),
            feed_lines: config.feed_lines,
            cut: config.cut,
            separator: config.separator,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn poem_job(&self, poem: &Poem) -> PrintJob {
        let title = poem
            .title
            .as_deref()
            .map(|t| wrap_text(&escpos::transliterate(t), self.columns))
            .unwrap_or_default();

        let mut lines = wrap_text(&escpos::transliterate(&poem.body), self.columns);
        if self.separator {
            lines.push(String::new());
            lines.push(self.rule());
        }

        self.job(title, lines)
    }

    /// A short notice printed when a run fails.
    pub fn error_slip(&self, stage: Stage, reason: &str) -> PrintJob {
        let mut lines = wrap_line("Sorry, no poem this time.", self.columns);
        lines.push(String::new());
        lines.extend(wrap_line(&format!("The {} step failed:", stage.label()), self.columns));
        lines.extend(wrap_text(&escpos::transliterate(reason), self.columns));
        lines.push(String::new());
        lines.extend(wrap_line("Press the button to try again.", self.columns));

        self.job(Vec::new(), lines)
    }

    /// Diagnostics page for bench testing the printer connection.
    pub fn test_page(&self, config: &PrinterConfig, now: DateTime<Local>) -> PrintJob {
        let baud = config
            .baud()
            .map_or_else(|| "unchanged".to_string(), |b| b.to_string());
        let details = [
            format!("Port: {}", config.device.display()),
            format!("Baud rate: {baud}"),
            format!("Columns: {}", self.columns),
            String::new(),
            "If you can read this, the printer connection is working.".to_string(),
            format!("Date: {}", now.format("%Y-%m-%d %H:%M:%S")),
            String::new(),
            self.rule(),
        ];

        let lines = details
            .iter()
            .flat_map(|l| wrap_line(l, self.columns))
            .collect();
        self.job(wrap_line("Test Print", self.columns), lines)
    }

    fn rule(&self) -> String {
        "-".repeat(self.columns)
    }

    fn job(&self, title: Vec<String>, lines: Vec<String>) -> PrintJob {
        PrintJob {
            title,
            lines,
            feed_lines: self.feed_lines,
            cut: self.cut,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
