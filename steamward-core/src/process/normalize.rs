//! Turns raw terminal bytes into clean text lines.
//!
//! PTY output arrives in arbitrary chunks, uses `\r\n` (or a bare `\r` for
//! in-place redraws), and carries color and cursor escape sequences. Lines
//! are split on either terminator, decoded lossily, stripped of escapes and
//! control characters, trimmed, and dropped when empty.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// CSI, OSC, charset selection and single-character escape sequences.
static ANSI_ESCAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1B(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1B]*(?:\x07|\x1B\\)|[()][0-9A-Za-z]|[@-Z\\-_])")
        .expect("valid ansi escape regex")
});

/// Removes terminal escape sequences from `text`.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE_RE.replace_all(text, "")
}

/// Cleans one already-split line. Returns `None` if nothing printable is left.
pub fn normalize_line(raw: &str) -> Option<String> {
    let stripped = strip_ansi(raw);
    let printable: String = stripped
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect();
    let trimmed = printable.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Incremental splitter that keeps partial lines between reads.
#[derive(Debug, Default)]
pub struct LineNormalizer {
    pending: Vec<u8>,
}

impl LineNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.take_pending(&mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flushes the trailing partial line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::with_capacity(1);
        self.take_pending(&mut lines);
        lines.pop()
    }

    fn take_pending(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let raw = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if let Some(line) = normalize_line(&raw) {
            lines.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_colors_and_cursor() {
        assert_eq!(strip_ansi("\x1b[0;32mOK\x1b[0m"), "OK");
        assert_eq!(strip_ansi("\x1b[2K\x1b[1GLoading"), "Loading");
        assert_eq!(strip_ansi("\x1b]0;steamcmd\x07title set"), "title set");
        assert_eq!(strip_ansi("\x1b(Bplain"), "plain");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }

    #[test]
    fn test_normalize_line_trims_and_drops_empty() {
        assert_eq!(normalize_line("  Loading Steam API...OK  "), Some("Loading Steam API...OK".into()));
        assert_eq!(normalize_line("   "), None);
        assert_eq!(normalize_line("\x1b[0m"), None);
        assert_eq!(normalize_line("a\x07b"), Some("ab".into()));
    }

    #[test]
    fn test_push_splits_crlf() {
        let mut normalizer = LineNormalizer::new();
        let lines = normalizer.push(b"Redirecting stderr\r\nLogging in user 'anonymous'\r\n\r\n");
        assert_eq!(lines, vec!["Redirecting stderr", "Logging in user 'anonymous'"]);
        assert_eq!(normalizer.finish(), None);
    }

    #[test]
    fn test_partial_lines_span_chunks() {
        let mut normalizer = LineNormalizer::new();
        assert!(normalizer.push(b"Update state (0x5) down").is_empty());
        let lines = normalizer.push(b"loading, progress: 1.00 (1 / 100)\nSucc");
        assert_eq!(lines, vec!["Update state (0x5) downloading, progress: 1.00 (1 / 100)"]);
        assert!(normalizer.push(b"ess! App '2394010' fully").is_empty());
        assert_eq!(normalizer.finish(), Some("Success! App '2394010' fully".into()));
        assert_eq!(normalizer.finish(), None);
    }

    #[test]
    fn test_bare_carriage_return_ends_line() {
        let mut normalizer = LineNormalizer::new();
        let lines = normalizer.push(b"10%\r20%\r30%\n");
        assert_eq!(lines, vec!["10%", "20%", "30%"]);
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut normalizer = LineNormalizer::new();
        let text = "Größe\n".as_bytes();
        assert!(normalizer.push(&text[..3]).is_empty());
        assert_eq!(normalizer.push(&text[3..]), vec!["Größe"]);
    }
}
