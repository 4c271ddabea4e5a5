//! Decodes SteamCMD output lines into progress events.
//!
//! Rules are tried top-down and the first matching one decides the result.
//! Lines no rule recognizes yield `None`; they only reach the debug log.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::format::bytes_to_size;
use super::types::{ProgressEvent, ProgressState};

/// Indent level of every event decoded from tool output.
const OUTPUT_INDENT: usize = 1;

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures<'_>) -> Option<ProgressEvent>,
}

impl Rule {
    fn new(
        name: &'static str,
        pattern: &str,
        build: fn(&Captures<'_>) -> Option<ProgressEvent>,
    ) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid decoder pattern"),
            build,
        }
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "downloading",
            r"Update state \(([^)]*)\) downloading, progress: ([0-9]+(?:\.[0-9]+)?) \(([0-9]+) / ([0-9]+)\)",
            |caps| progress_event(caps, ProgressState::DownloadProgress, "Downloading"),
        ),
        Rule::new(
            "verifying",
            r"Update state \(([^)]*)\) verifying update, progress: ([0-9]+(?:\.[0-9]+)?) \(([0-9]+) / ([0-9]+)\)",
            |caps| progress_event(caps, ProgressState::Verifying, "Verifying"),
        ),
        Rule::new("completed", r"App '([^']*)' fully installed", |_| {
            Some(ProgressEvent::new(
                ProgressState::Completed,
                "Installation completed.",
                OUTPUT_INDENT,
            ))
        }),
    ]
});

fn progress_event(caps: &Captures<'_>, state: ProgressState, verb: &str) -> Option<ProgressEvent> {
    // SteamCMD already prints a percentage here: 42.00 means 42%
    let raw: f64 = caps.get(2)?.as_str().parse().ok()?;
    if !raw.is_finite() {
        return None;
    }
    let percent = raw.round().clamp(0.0, 100.0);
    let done: u64 = caps.get(3)?.as_str().parse().ok()?;
    let total: u64 = caps.get(4)?.as_str().parse().ok()?;

    let message = format!(
        "{} application ({:.0}% / {} of {})...",
        verb,
        percent,
        bytes_to_size(done),
        bytes_to_size(total)
    );
    Some(ProgressEvent::new(state, message, OUTPUT_INDENT).with_progress(Some(percent), done, Some(total)))
}

/// Stateless line classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputDecoder;

impl OutputDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Event for `line`, or `None` when no rule matches or numbers do not parse.
    pub fn decode(&self, line: &str) -> Option<ProgressEvent> {
        let (rule, caps) = Self::first_match(line)?;
        let event = (rule.build)(&caps);
        if event.is_none() {
            debug!(rule = rule.name, "Skipping line with unparsable numbers");
        }
        event
    }

    fn first_match(line: &str) -> Option<(&'static Rule, Captures<'_>)> {
        RULES
            .iter()
            .find_map(|rule| rule.pattern.captures(line).map(|caps| (rule, caps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_name(line: &str) -> Option<&'static str> {
        OutputDecoder::first_match(line).map(|(rule, _)| rule.name)
    }

    #[test]
    fn test_downloading_line() {
        let event = OutputDecoder::new()
            .decode("Update state (0x5) downloading, progress: 42.00 (100 / 200)")
            .unwrap();

        assert_eq!(event.state, ProgressState::DownloadProgress);
        assert_eq!(event.percent, Some(42.0));
        assert_eq!(event.bytes_done, Some(100));
        assert_eq!(event.bytes_total, Some(200));
        assert_eq!(event.indent_level, 1);
        assert_eq!(event.message, "Downloading application (42% / 100 B of 200 B)...");
    }

    #[test]
    fn test_verifying_line_with_large_sizes() {
        let event = OutputDecoder::new()
            .decode(" Update state (0x81) verifying update, progress: 99.62 (3214907392 / 3227066470)")
            .unwrap();

        assert_eq!(event.state, ProgressState::Verifying);
        assert_eq!(event.percent, Some(100.0));
        assert_eq!(event.bytes_done, Some(3_214_907_392));
        assert_eq!(event.message, "Verifying application (100% / 3.0 GiB of 3.0 GiB)...");
    }

    #[test]
    fn test_completed_line() {
        let event = OutputDecoder::new().decode("Success! App 'MyApp' fully installed.").unwrap();
        assert_eq!(event.state, ProgressState::Completed);
        assert_eq!(event.message, "Installation completed.");
        assert_eq!(event.percent, None);
        assert_eq!(event.bytes_done, None);
        assert_eq!(event.bytes_total, None);
    }

    #[test]
    fn test_unmatched_line() {
        let decoder = OutputDecoder::new();
        assert_eq!(decoder.decode("some unrelated diagnostic line"), None);
        assert_eq!(decoder.decode("Loading Steam API...OK"), None);
        assert_eq!(rule_name("Redirecting stderr to '/home/steam/Steam/logs/stderr.txt'"), None);
    }

    #[test]
    fn test_unparsable_numbers_are_skipped() {
        let decoder = OutputDecoder::new();
        let overflow = "Update state (0x5) downloading, progress: 1.00 (1 / 99999999999999999999999)";
        assert_eq!(rule_name(overflow), Some("downloading"));
        assert_eq!(decoder.decode(overflow), None);
        assert_eq!(
            decoder.decode("Update state (0x5) downloading, progress: n/a (1 / 2)"),
            None
        );
    }

    #[test]
    fn test_first_rule_wins() {
        let line = "Update state (0x5) downloading, progress: 5.00 (5 / 100) App '1' fully installed";
        let decoder = OutputDecoder::new();
        assert_eq!(rule_name(line), Some("downloading"));
        assert_eq!(decoder.decode(line).unwrap().state, ProgressState::DownloadProgress);
    }

    #[test]
    fn test_sequence_keeps_order() {
        let decoder = OutputDecoder::new();
        let lines = [
            "Update state (0x61) downloading, progress: 10.00 (10 / 100)",
            "Update state (0x81) verifying update, progress: 100.00 (100 / 100)",
            "Success! App '2394010' fully installed.",
        ];
        let events: Vec<_> = lines.iter().filter_map(|l| decoder.decode(l)).collect();

        let states: Vec<_> = events.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                ProgressState::DownloadProgress,
                ProgressState::Verifying,
                ProgressState::Completed
            ]
        );
        assert_eq!(events[0].percent, Some(10.0));
        assert_eq!(events[1].percent, Some(100.0));
    }
}
