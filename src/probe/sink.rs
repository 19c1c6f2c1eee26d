//! Result and lifecycle sinks
//!
//! The engine reports from its own background task; implementations
//! must be callable off the caller's thread.

use tokio::sync::mpsc;
use uuid::Uuid;

use super::results::{ProbeResult, ProbeStats};
use crate::error::{ProbeError, SessionError};
use crate::http::{ProbeRequest, ProbeResponse};

/// What a finished run reports to its sink.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Which run completed
    pub run_id: Uuid,
    pub stats: ProbeStats,
    /// Present when the run aborted on a fatal condition. Results
    /// produced before the abort remain valid.
    pub fatal: Option<String>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none()
    }
}

/// Consumer of per-candidate results and run completion.
pub trait ProbeSink: Send + Sync {
    fn on_result(&self, result: &ProbeResult);

    /// Non-fatal dispatch error for one candidate; the run continues.
    fn on_error(&self, candidate: &str, error: &ProbeError) {
        let _ = (candidate, error);
    }

    fn on_completed(&self, outcome: RunOutcome);
}

/// Sink events as an owned stream, for headless consumers and tests.
#[derive(Debug)]
pub enum ProbeEvent {
    Result(ProbeResult),
    Error { candidate: String, message: String },
    Completed(RunOutcome),
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProbeEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProbeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProbeSink for ChannelSink {
    fn on_result(&self, result: &ProbeResult) {
        let _ = self.tx.send(ProbeEvent::Result(result.clone()));
    }

    fn on_error(&self, candidate: &str, error: &ProbeError) {
        let _ = self.tx.send(ProbeEvent::Error {
            candidate: candidate.to_string(),
            message: error.to_string(),
        });
    }

    fn on_completed(&self, outcome: RunOutcome) {
        let _ = self.tx.send(ProbeEvent::Completed(outcome));
    }
}

/// Records every sent probe. Failures are logged by the engine, never
/// propagated into the run.
pub trait HistorySink: Send + Sync {
    fn record(
        &self,
        request: &ProbeRequest,
        response: Option<&ProbeResponse>,
    ) -> Result<(), SessionError>;
}

/// Drops everything; for tests and history-less runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHistory;

impl HistorySink for NullHistory {
    fn record(
        &self,
        _request: &ProbeRequest,
        _response: Option<&ProbeResponse>,
    ) -> Result<(), SessionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Verdict;

    #[test]
    fn channel_sink_forwards_events_in_order() {
        let (sink, mut rx) = ChannelSink::new();

        sink.on_result(&ProbeResult {
            seq: 0,
            candidate: "A".to_string(),
            verdict: Verdict::Success,
            response: ProbeResponse::new(200, "OK", b"ok".to_vec()),
            sent_request: ProbeRequest::new("POST", "http://target.local/"),
        });
        sink.on_completed(RunOutcome {
            run_id: Uuid::new_v4(),
            stats: ProbeStats::default(),
            fatal: None,
        });

        assert!(matches!(rx.try_recv().unwrap(), ProbeEvent::Result(_)));
        assert!(matches!(rx.try_recv().unwrap(), ProbeEvent::Completed(_)));
        assert!(rx.try_recv().is_err());
    }
}
