//! Turning model output into a [`Poem`].
//!
//! Model output is loosely formatted: stray whitespace, Markdown fences and
//! emphasis, an optional heading, sometimes a cut-off last line.  The parser
//! never fails on shape; the only error is having nothing to print.

use super::GenerationError;

/// A poem ready for layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poem {
    pub title: Option<String>,
    /// Poem text with `\n` between lines.  Blank lines separate stanzas.
    pub body: String,
}

impl Poem {
    pub fn new(title: Option<String>, body: impl Into<String>) -> Self {
        Self {
            title,
            body: body.into(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }
}

/// Parse raw model text into a [`Poem`].
///
/// * CRLF / CR line endings become `\n`.
/// * Code-fence lines are dropped.
/// * Every line is trimmed; runs of blank lines collapse to one; blank lines
///   at either end are removed.
/// * Lines wholly wrapped in `*`, `**` or `_` lose the markers.
/// * A first line written as `# Heading`, `**Heading**` or `Title: …`
///   becomes the title when more text follows it.
///
/// # Errors
///
/// [`GenerationError::EmptyPoem`] when no body text remains.
///
/// ```
/// use poetry_printer::poem::parse_poem;
///
/// let poem = parse_poem("## Morning\n\nDew on the railing\nA kettle clicks off\n").unwrap();
/// assert_eq!(poem.title.as_deref(), Some("Morning"));
/// assert_eq!(poem.body, "Dew on the railing\nA kettle clicks off");
/// ```
pub fn parse_poem(raw: &str) -> Result<Poem, GenerationError> {
    let normalised = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<&str> = Vec::new();
    for line in normalised.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }
        if trimmed.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(trimmed);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let title = match lines.as_slice() {
        [first, next, ..] => title_of(first, next),
        _ => None,
    };
    let rest = if title.is_some() { &lines[1..] } else { &lines[..] };

    let body = rest
        .iter()
        .skip_while(|l| l.is_empty())
        .map(|l| unwrap_emphasis(l))
        .collect::<Vec<_>>()
        .join("\n");
    if body.trim().is_empty() {
        return Err(GenerationError::EmptyPoem);
    }

    Ok(Poem { title, body })
}

/// Recognise `first` as a heading.  Markdown headings and bold lines need a
/// blank line after them; `Title:` labels do not.
fn title_of(first: &str, next: &str) -> Option<String> {
    let candidate = if first.to_ascii_lowercase().starts_with("title:") {
        unwrap_emphasis(first["title:".len()..].trim())
    } else if next.is_empty() && first.starts_with('#') {
        first.trim_start_matches('#').trim()
    } else if next.is_empty() && is_bold(first) {
        unwrap_emphasis(first)
    } else {
        return None;
    };

    let title = candidate.trim_matches('"').trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn is_bold(line: &str) -> bool {
    ["**", "__"]
        .iter()
        .any(|m| line.len() > 2 * m.len() && line.starts_with(m) && line.ends_with(m))
}

fn unwrap_emphasis(line: &str) -> &str {
    for marker in ["**", "__", "*", "_"] {
        if line.len() > 2 * marker.len() && line.starts_with(marker) && line.ends_with(marker) {
            return line[marker.len()..line.len() - marker.len()].trim();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_haiku_has_no_title() {
        let poem = parse_poem("Leaves drift past the glass\nA cat pretends not to watch\nSteam curls from the mug").unwrap();
        assert!(poem.title.is_none());
        assert_eq!(poem.lines().count(), 3);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let poem = parse_poem("\n\n   first line   \n\tsecond line\t\n\n\n").unwrap();
        assert_eq!(poem.body, "first line\nsecond line");
    }

    #[test]
    fn crlf_is_normalised() {
        let poem = parse_poem("one\r\ntwo\rthree").unwrap();
        assert_eq!(poem.body, "one\ntwo\nthree");
    }

    #[test]
    fn stanza_breaks_survive_but_collapse() {
        let poem = parse_poem("a\nb\n\n\n\nc\nd").unwrap();
        assert_eq!(poem.body, "a\nb\n\nc\nd");
    }

    #[test]
    fn markdown_heading_becomes_title() {
        let poem = parse_poem("# Quiet Desk\n\nA lamp hums softly").unwrap();
        assert_eq!(poem.title.as_deref(), Some("Quiet Desk"));
        assert_eq!(poem.body, "A lamp hums softly");
    }

    #[test]
    fn bold_heading_becomes_title() {
        let poem = parse_poem("**Window Light**\n\nDust in the sunbeam\nhangs").unwrap();
        assert_eq!(poem.title.as_deref(), Some("Window Light"));
        assert_eq!(poem.body, "Dust in the sunbeam\nhangs");
    }

    #[test]
    fn title_label_becomes_title() {
        let poem = parse_poem("Title: \"Rain\"\nGrey drops on the pane").unwrap();
        assert_eq!(poem.title.as_deref(), Some("Rain"));
        assert_eq!(poem.body, "Grey drops on the pane");
    }

    #[test]
    fn heading_alone_is_the_body() {
        let poem = parse_poem("# Just this").unwrap();
        assert!(poem.title.is_none());
        assert_eq!(poem.body, "# Just this");
    }

    #[test]
    fn italic_lines_are_unwrapped() {
        let poem = parse_poem("*soft morning light*\n_a cup of tea_").unwrap();
        assert_eq!(poem.body, "soft morning light\na cup of tea");
    }

    #[test]
    fn code_fences_are_dropped() {
        let poem = parse_poem("```text\nline one\nline two\n```").unwrap();
        assert_eq!(poem.body, "line one\nline two");
    }

    #[test]
    fn truncated_output_is_kept() {
        let poem = parse_poem("Snow on the bike rack\nA bell rings once and then st").unwrap();
        assert_eq!(poem.lines().last(), Some("A bell rings once and then st"));
    }

    #[test]
    fn empty_or_blank_is_an_error() {
        assert!(matches!(parse_poem(""), Err(GenerationError::EmptyPoem)));
        assert!(matches!(parse_poem("  \n\n\t"), Err(GenerationError::EmptyPoem)));
        assert!(matches!(parse_poem("```\n```"), Err(GenerationError::EmptyPoem)));
    }
}
