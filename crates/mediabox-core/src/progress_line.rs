//! Best-effort percentage extraction from free-text downloader output.
//!
//! Downloader progress lines look like `[download]  45.2% of 10.00MiB at ...`.
//! The pattern matching is brittle by nature, so it lives behind
//! [`ProgressLineParser`] and can be swapped without touching the job state
//! machine or the worker.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Extracts a completion percentage from one output line.
pub trait ProgressLineParser: Send + Sync {
    /// Percentage in `[0, 100]`, or `None` if the line carries none.
    fn percent(&self, line: &str) -> Option<f64>;
}

/// Takes the first `<digits>[.<digits>]%` token of the line.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentToken;

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+\.?\d*)%").expect("static percent pattern"))
}

impl ProgressLineParser for PercentToken {
    fn percent(&self, line: &str) -> Option<f64> {
        let caps = percent_regex().captures(line)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        if value.is_finite() {
            Some(value.clamp(0.0, 100.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloader_progress_line() {
        let p = PercentToken;
        assert_eq!(
            p.percent("[download]  45.2% of   10.00MiB at  1.21MiB/s ETA 00:04"),
            Some(45.2)
        );
        assert_eq!(p.percent("download 45.2% of 10MB"), Some(45.2));
        assert_eq!(p.percent("[download] 100% of 3.1MiB in 00:02"), Some(100.0));
    }

    #[test]
    fn integer_and_trailing_dot() {
        let p = PercentToken;
        assert_eq!(p.percent("7% done"), Some(7.0));
        assert_eq!(p.percent("12.% odd"), Some(12.0));
    }

    #[test]
    fn first_token_wins_and_values_are_clamped() {
        let p = PercentToken;
        assert_eq!(p.percent("3.5% then 90%"), Some(3.5));
        assert_eq!(p.percent("weird 400%"), Some(100.0));
    }

    #[test]
    fn lines_without_a_token() {
        let p = PercentToken;
        assert_eq!(p.percent("[youtube] abc: Downloading webpage"), None);
        assert_eq!(p.percent("100 percent"), None);
        assert_eq!(p.percent(""), None);
    }
}
