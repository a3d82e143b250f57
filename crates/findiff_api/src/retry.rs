use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Attempts made by the bounded job-status poll before giving up.
pub const POLL_MAX_ATTEMPTS: u32 = 150;
/// Fixed delay between job-status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

fn transient_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)rate.?limit|overloaded|service.?unavailable|upstream.?connect|connection.?refused|timed?.?out")
            .expect("retry regex must compile")
    })
}

/// Whether a failed status lookup is worth another attempt.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504) || transient_error_regex().is_match(error_text)
}

/// Total wall-clock budget of the bounded poll.
pub fn poll_budget() -> Duration {
    POLL_INTERVAL * POLL_MAX_ATTEMPTS
}

/// Job status values reported by the legacy status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Completed,
    Failed,
}

impl JobState {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "completed" | "complete" | "done" | "succeeded" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
