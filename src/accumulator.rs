//! Steady-rate reveal of streamed assistant text.
//!
//! Arrival and reveal are decoupled: chunks land in a pending buffer, each frame
//! moves a fixed number of characters into the revealed tail, and the revealed
//! tail is committed into the bound transcript turn at most once per commit
//! interval. The accumulator is owned by one submission at a time.

use std::time::{Duration, Instant};

/// Identifies one submission (one chat turn or section action).
pub type SubmissionId = u64;

pub const DEFAULT_REVEAL_CHARS: usize = 15;
pub const DEFAULT_COMMIT_INTERVAL: Duration = Duration::from_millis(50);

/// Which submission and which transcript slot drained text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorBinding {
    pub submission: SubmissionId,
    pub turn_index: usize,
}

/// Revealed text ready to be appended to the bound turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub binding: AccumulatorBinding,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ChunkAccumulator {
    reveal_chars: usize,
    commit_interval: Duration,
    binding: Option<AccumulatorBinding>,
    pending: String,
    revealed: String,
    last_commit: Option<Instant>,
}

impl Default for ChunkAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_CHARS, DEFAULT_COMMIT_INTERVAL)
    }
}

impl ChunkAccumulator {
    pub fn new(reveal_chars: usize, commit_interval: Duration) -> Self {
        Self {
            reveal_chars: reveal_chars.max(1),
            commit_interval,
            binding: None,
            pending: String::new(),
            revealed: String::new(),
            last_commit: None,
        }
    }

    /// Take ownership for a new submission; anything left from before is dropped.
    pub fn bind(&mut self, submission: SubmissionId, turn_index: usize) {
        self.reset();
        self.binding = Some(AccumulatorBinding {
            submission,
            turn_index,
        });
    }

    /// Drop all buffered text and the binding.
    pub fn reset(&mut self) {
        self.binding = None;
        self.pending.clear();
        self.revealed.clear();
        self.last_commit = None;
    }

    pub fn binding(&self) -> Option<AccumulatorBinding> {
        self.binding
    }

    pub fn is_bound_to(&self, submission: SubmissionId) -> bool {
        self.binding
            .is_some_and(|binding| binding.submission == submission)
    }

    /// Queue text for `submission`. Text for any other submission is refused.
    pub fn push(&mut self, submission: SubmissionId, text: &str) -> bool {
        if !self.is_bound_to(submission) {
            return false;
        }

        self.pending.push_str(text);
        true
    }

    /// Nothing pending and nothing revealed-but-uncommitted.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.revealed.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.chars().count()
    }

    /// Advance one frame.
    ///
    /// Moves up to `reveal_chars` characters from pending to revealed, then
    /// returns a commit if revealed text exists and the commit interval has
    /// elapsed since the previous commit.
    pub fn tick(&mut self, now: Instant) -> Option<Commit> {
        let binding = self.binding?;

        if !self.pending.is_empty() {
            let cut = self
                .pending
                .char_indices()
                .nth(self.reveal_chars)
                .map_or(self.pending.len(), |(index, _)| index);
            self.revealed.extend(self.pending.drain(..cut));
        }

        if self.revealed.is_empty() {
            return None;
        }

        let due = self
            .last_commit
            .map_or(true, |last| now.saturating_duration_since(last) >= self.commit_interval);
        if !due {
            return None;
        }

        self.last_commit = Some(now);
        Some(Commit {
            binding,
            text: std::mem::take(&mut self.revealed),
        })
    }

    /// Commit everything buffered at once, ignoring pacing.
    pub fn flush(&mut self) -> Option<Commit> {
        let binding = self.binding?;
        self.revealed.push_str(&self.pending);
        self.pending.clear();
        if self.revealed.is_empty() {
            return None;
        }

        Some(Commit {
            binding,
            text: std::mem::take(&mut self.revealed),
        })
    }
}
