//! Local usage gate for anonymous sessions.
//!
//! Authenticated sessions are not counted here: the server enforces their limits
//! and signals exhaustion with `free_tier_limit` mid-stream.

use findiff_provider::SessionSnapshot;

pub const DEFAULT_ANONYMOUS_QUOTA: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Go ahead; `remaining` is the anonymous quota left afterwards, if counted.
    Allow { remaining: Option<u32> },
    /// Anonymous quota exhausted; show the sign-in prompt instead of connecting.
    SignInRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    anonymous_remaining: u32,
    upgrade_prompts: u32,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(DEFAULT_ANONYMOUS_QUOTA)
    }
}

impl AccessGate {
    pub fn new(anonymous_quota: u32) -> Self {
        Self {
            anonymous_remaining: anonymous_quota,
            upgrade_prompts: 0,
        }
    }

    /// Decide one submission attempt without spending quota.
    ///
    /// `remaining` is the anonymous quota left once the submission is
    /// committed with [`AccessGate::consume`].
    pub fn check_submission(&self, session: SessionSnapshot) -> GateDecision {
        if session.authenticated() {
            return GateDecision::Allow { remaining: None };
        }

        match self.anonymous_remaining.checked_sub(1) {
            Some(remaining) => GateDecision::Allow {
                remaining: Some(remaining),
            },
            None => GateDecision::SignInRequired,
        }
    }

    /// Spend one anonymous question. Called once the connection is open.
    pub fn consume(&mut self, session: SessionSnapshot) -> Option<u32> {
        if session.authenticated() {
            return None;
        }
        self.anonymous_remaining = self.anonymous_remaining.saturating_sub(1);
        Some(self.anonymous_remaining)
    }

    pub fn anonymous_remaining(&self) -> u32 {
        self.anonymous_remaining
    }

    /// Record that the server ended a stream with `free_tier_limit`.
    pub fn record_tier_limit(&mut self) {
        self.upgrade_prompts += 1;
    }

    pub fn upgrade_prompts(&self) -> u32 {
        self.upgrade_prompts
    }
}
