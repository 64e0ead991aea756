//! ESC/POS command builders and text encoding.
//!
//! Only the handful of commands a text receipt needs.  Builders return owned
//! byte vectors so a job is assembled with `Vec::extend`.

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = b'\n';

/// Horizontal alignment for the following lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// `ESC @`: reset the printer to its power-on defaults.
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// `ESC a n`
pub fn align(align: Align) -> Vec<u8> {
    let n = match align {
        Align::Left => 0,
        Align::Center => 1,
        Align::Right => 2,
    };
    vec![ESC, b'a', n]
}

/// `ESC E n`: bold on or off.
pub fn emphasis(on: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(on)]
}

/// `ESC d n`: print the buffer and feed `lines` lines.
pub fn feed(lines: u8) -> Vec<u8> {
    vec![ESC, b'd', lines]
}

/// `GS V 1`: partial cut.  Printers without a cutter ignore it.
pub fn cut() -> Vec<u8> {
    vec![GS, b'V', 1]
}

/// Map text onto the printer's ASCII code page.
///
/// Typographic punctuation becomes its ASCII look-alike, accented Latin
/// letters lose the accent, everything else outside printable ASCII becomes
/// `?`.  Newlines are kept.
///
/// ```
/// use poetry_printer::printer::escpos::transliterate;
///
/// assert_eq!(transliterate("“Café” — it’s late…"), "\"Cafe\" - it's late...");
/// ```
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            ' '..='~' => out.push(c),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' | '«' | '»' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2002}'..='\u{200A}' => out.push(' '),
            '\u{200B}' | '\u{FEFF}' => {}
            _ => out.push(fold_accent(c).unwrap_or('?')),
        }
    }
    out
}

fn fold_accent(c: char) -> Option<char> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(base)
}

/// One printed line: the transliterated text followed by LF.
pub fn text_line(line: &str) -> Vec<u8> {
    let mut bytes = transliterate(line).into_bytes();
    bytes.push(LF);
    bytes
}

/// Recover the printed text from a job, dropping every command.
///
/// Feed commands count as that many newlines, so the result looks like the
/// paper coming out of the printer.
pub fn strip_commands(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            ESC => {
                match bytes.get(i + 1) {
                    Some(b'@') => i += 2,
                    Some(b'd') => {
                        let n = bytes.get(i + 2).copied().unwrap_or(0);
                        out.extend(std::iter::repeat('\n').take(usize::from(n)));
                        i += 3;
                    }
                    // ESC a n, ESC E n and the other single-argument commands.
                    Some(_) => i += 3,
                    None => i += 1,
                }
            }
            GS => i += 3,
            b => {
                out.push(char::from(b));
                i += 1;
            }
        }
    }
    out
}
