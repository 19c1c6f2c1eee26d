//! Probe result collection
//!
//! Results land in exactly one of two partitions, in dispatch order:
//! whitelist (the target accepted the candidate) or blacklist (the
//! rejection signature matched).

use std::time::{Duration, Instant};

use super::classify::Verdict;
use crate::http::{ProbeRequest, ProbeResponse};

/// One classified attempt.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Dispatch order among non-retried attempts
    pub seq: usize,
    /// Candidate value this attempt carried
    pub candidate: String,
    pub verdict: Verdict,
    pub response: ProbeResponse,
    pub sent_request: ProbeRequest,
}

/// Disjoint whitelist/blacklist partitions, each in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct ResultPartitions {
    pub whitelist: Vec<ProbeResult>,
    pub blacklist: Vec<ProbeResult>,
}

impl ResultPartitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ProbeResult) {
        match result.verdict {
            Verdict::Success => self.whitelist.push(result),
            Verdict::Failure => self.blacklist.push(result),
        }
    }

    pub fn total(&self) -> usize {
        self.whitelist.len() + self.blacklist.len()
    }

    /// All results merged back into dispatch order.
    pub fn candidates_in_order(&self) -> Vec<&ProbeResult> {
        let mut all: Vec<&ProbeResult> = self.whitelist.iter().chain(self.blacklist.iter()).collect();
        all.sort_by_key(|r| r.seq);
        all
    }

    pub fn whitelisted_values(&self) -> Vec<&str> {
        self.whitelist.iter().map(|r| r.candidate.as_str()).collect()
    }

    pub fn blacklisted_values(&self) -> Vec<&str> {
        self.blacklist.iter().map(|r| r.candidate.as_str()).collect()
    }
}

/// Run counters, updated by the dispatch loop as it goes.
#[derive(Debug, Clone, Default)]
pub struct ProbeStats {
    /// Requests handed to the transport, retries included
    pub dispatched: usize,
    /// Classified attempts counted toward completion
    pub completed: usize,
    /// Timed-out attempts that were retried
    pub retried: usize,
    /// Candidates skipped on non-timeout transport failures
    pub skipped: usize,
    /// Run start
    pub start_time: Option<Instant>,
    /// Total run time, set when the loop exits
    pub elapsed: Duration,
}

impl ProbeStats {
    /// Fraction of the candidate space accounted for, counting skips.
    pub fn progress(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (self.completed + self.skipped) as f64 / total as f64
        }
    }
}
