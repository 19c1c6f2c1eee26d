//! Dispatch loop and run controller
//!
//! One engine drives one run at a time on a dedicated tokio task, so
//! the caller's thread of control is never blocked by network I/O.
//! Control methods flip the shared run state; the loop observes it at
//! its suspension points (pause wait, inter-request delay, dispatch).
//! Cancellation is cooperative: an in-flight dispatch completes, no new
//! one starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::candidates::{Candidates, CharRange, Charset};
use super::classify::Classifier;
use super::param::{self, ParameterParser};
use super::results::{ProbeResult, ProbeStats, ResultPartitions};
use super::sink::{HistorySink, ProbeSink, RunOutcome};
use crate::app::ProbeOptions;
use crate::error::{ConfigError, ProbeError};
use crate::http::{ProbeRequest, Transport};

/// Run lifecycle. Stop is terminal: once Stopping is observed the run
/// moves to Completed and never resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopping,
    Completed,
}

/// Unit for the inter-request delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayUnit {
    Millis,
    Seconds,
    Minutes,
}

impl DelayUnit {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "" => Err(ConfigError::MissingDelayUnit),
            "ms" | "millis" | "milliseconds" => Ok(DelayUnit::Millis),
            "s" | "sec" | "secs" | "seconds" => Ok(DelayUnit::Seconds),
            "m" | "min" | "mins" | "minutes" => Ok(DelayUnit::Minutes),
            other => Err(ConfigError::UnknownDelayUnit(other.to_string())),
        }
    }
}

/// Inter-request delay. The unit is mandatory: a delay with no unit is
/// rejected at `start()`, before any dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RequestDelay {
    pub duration: u64,
    pub unit: Option<DelayUnit>,
}

impl RequestDelay {
    pub fn new(duration: u64, unit: DelayUnit) -> Self {
        Self {
            duration,
            unit: Some(unit),
        }
    }

    pub fn none() -> Self {
        Self {
            duration: 0,
            unit: Some(DelayUnit::Millis),
        }
    }

    fn to_duration(self) -> Result<Duration, ConfigError> {
        let unit = self.unit.ok_or(ConfigError::MissingDelayUnit)?;
        Ok(match unit {
            DelayUnit::Millis => Duration::from_millis(self.duration),
            DelayUnit::Seconds => Duration::from_secs(self.duration),
            DelayUnit::Minutes => Duration::from_secs(self.duration * 60),
        })
    }
}

/// How candidates mutate the cloned request template.
#[derive(Debug, Clone)]
pub enum ProbeStrategy {
    /// Substitute each candidate into the named form parameter.
    Range { target_param: String },
    /// Blind repeated requests: strip the session cookie so every
    /// response carries a freshly issued token.
    TokenHarvest,
}

/// Everything one run needs.
#[derive(Debug)]
pub struct ProbeConfig {
    pub template: ProbeRequest,
    pub candidates: Candidates,
    pub strategy: ProbeStrategy,
    pub classifier: Classifier,
    pub delay: RequestDelay,
}

impl ProbeConfig {
    /// Build a run configuration from the recognized options. All
    /// validation happens here or in `start()`, never mid-run.
    pub fn from_options(options: &ProbeOptions, template: ProbeRequest) -> Result<Self, ConfigError> {
        let unit = DelayUnit::parse(&options.delay_unit)?;
        let delay = RequestDelay::new(options.delay_duration, unit);

        if options.number_tokens > 0 {
            let classifier = match options.signature.as_deref() {
                Some(pattern) => Classifier::signature(pattern)?,
                None => Classifier::always_success(),
            };
            return Ok(Self {
                template,
                candidates: Candidates::Repeat {
                    count: options.number_tokens,
                },
                strategy: ProbeStrategy::TokenHarvest,
                classifier,
                delay,
            });
        }

        let target_param = options
            .target_param
            .clone()
            .ok_or(ConfigError::MissingTargetParam)?;
        let pattern = options
            .signature
            .as_deref()
            .ok_or(ConfigError::MissingSignature)?;
        let classifier = Classifier::signature(pattern)?;

        let charset = Charset::parse(&options.charset)?;
        let (default_start, default_end) = charset.default_range();
        let start = options.range_start.unwrap_or(default_start);
        let end = options.range_end.unwrap_or(default_end);
        if end <= start {
            return Err(ConfigError::EmptyRange { start, end });
        }

        let mut range = CharRange::new(start, end);
        range.prefix = options.prefix.clone();
        range.postfix = options.postfix.clone();

        Ok(Self {
            template,
            candidates: Candidates::Range(range),
            strategy: ProbeStrategy::Range { target_param },
            classifier,
            delay,
        })
    }
}

/// Run controller: validates, launches, and steers one probe run.
///
/// Transport, parameter parser, and history sink are injected at
/// construction; the engine owns nothing global.
pub struct ProbeEngine {
    transport: Arc<dyn Transport>,
    parser: Arc<dyn ParameterParser>,
    history: Arc<dyn HistorySink>,
    state_tx: Arc<watch::Sender<RunState>>,
    results: Arc<RwLock<ResultPartitions>>,
    stats: Arc<RwLock<ProbeStats>>,
    run_id: Mutex<Uuid>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ProbeEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        parser: Arc<dyn ParameterParser>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            transport,
            parser,
            history,
            state_tx: Arc::new(state_tx),
            results: Arc::new(RwLock::new(ResultPartitions::new())),
            stats: Arc::new(RwLock::new(ProbeStats::default())),
            run_id: Mutex::new(Uuid::new_v4()),
            handle: Mutex::new(None),
        }
    }

    /// Validate the configuration and launch the dispatch loop on a
    /// background task. Configuration problems surface here,
    /// synchronously, before any dispatch.
    pub fn start(&self, config: ProbeConfig, sink: Arc<dyn ProbeSink>) -> Result<(), ProbeError> {
        if config.candidates.is_empty() {
            return Err(match &config.candidates {
                Candidates::Range(range) => ConfigError::EmptyRange {
                    start: range.start,
                    end: range.end,
                }
                .into(),
                Candidates::Repeat { .. } => ConfigError::EmptyRange { start: 0, end: 0 }.into(),
            });
        }
        let delay = config.delay.to_duration()?;

        // One run per engine at a time; a completed engine can start
        // a fresh run.
        let started = self.state_tx.send_if_modified(|state| {
            if matches!(*state, RunState::Idle | RunState::Completed) {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(ProbeError::AlreadyRunning);
        }

        let run_id = Uuid::new_v4();
        *self.run_id.lock() = run_id;
        *self.results.write() = ResultPartitions::new();
        *self.stats.write() = ProbeStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        };

        tracing::info!(
            run = %run_id,
            candidates = config.candidates.len(),
            "starting probe run"
        );

        let worker = RunWorker {
            transport: self.transport.clone(),
            parser: self.parser.clone(),
            history: self.history.clone(),
            state_tx: self.state_tx.clone(),
            state_rx: self.state_tx.subscribe(),
            results: self.results.clone(),
            stats: self.stats.clone(),
            run_id,
            sink,
            config,
            delay,
        };
        *self.handle.lock() = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Pause a running probe. No-op unless Running.
    pub fn pause(&self) {
        self.state_tx.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Paused;
                true
            } else {
                false
            }
        });
    }

    /// Resume a paused probe. No-op unless Paused.
    pub fn resume(&self) {
        self.state_tx.send_if_modified(|state| {
            if *state == RunState::Paused {
                *state = RunState::Running;
                true
            } else {
                false
            }
        });
    }

    /// Request cooperative cancellation. Idempotent, and terminal: the
    /// loop stops dispatching as soon as it observes the flag.
    pub fn stop(&self) {
        self.state_tx.send_if_modified(|state| {
            if matches!(*state, RunState::Running | RunState::Paused) {
                *state = RunState::Stopping;
                true
            } else {
                false
            }
        });
    }

    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    pub fn run_id(&self) -> Uuid {
        *self.run_id.lock()
    }

    pub fn results(&self) -> ResultPartitions {
        self.results.read().clone()
    }

    pub fn stats(&self) -> ProbeStats {
        self.stats.read().clone()
    }

    /// Wait for the background task to finish.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// State moved onto the background task for one run.
struct RunWorker {
    transport: Arc<dyn Transport>,
    parser: Arc<dyn ParameterParser>,
    history: Arc<dyn HistorySink>,
    state_tx: Arc<watch::Sender<RunState>>,
    state_rx: watch::Receiver<RunState>,
    results: Arc<RwLock<ResultPartitions>>,
    stats: Arc<RwLock<ProbeStats>>,
    run_id: Uuid,
    sink: Arc<dyn ProbeSink>,
    config: ProbeConfig,
    delay: Duration,
}

impl RunWorker {
    async fn run(mut self) {
        let outcome = self.dispatch_loop().await;

        {
            let mut stats = self.stats.write();
            if let Some(start) = stats.start_time {
                stats.elapsed = start.elapsed();
            }
        }
        self.state_tx.send_replace(RunState::Completed);

        let fatal = outcome.err().map(|e| e.to_string());
        match &fatal {
            Some(error) => {
                tracing::error!(run = %self.run_id, error = %error, "probe run aborted")
            }
            None => {
                let stats = self.stats.read();
                tracing::info!(
                    run = %self.run_id,
                    completed = stats.completed,
                    retried = stats.retried,
                    skipped = stats.skipped,
                    "probe run finished"
                );
            }
        }

        self.sink.on_completed(RunOutcome {
            run_id: self.run_id,
            stats: self.stats.read().clone(),
            fatal,
        });
    }

    async fn dispatch_loop(&mut self) -> Result<(), ProbeError> {
        let candidates = self.config.candidates.clone();
        let mut iter = candidates.iter();
        // A timed-out attempt parks its candidate here and goes around
        // again, so timeouts reduce progress without ending the run.
        let mut queued: Option<String> = None;
        let mut seq = 0usize;

        loop {
            if self.wait_while_paused().await == RunState::Stopping {
                tracing::debug!(run = %self.run_id, "stop observed, ending run");
                return Ok(());
            }

            let candidate = match queued.take().or_else(|| iter.next()) {
                Some(candidate) => candidate,
                None => return Ok(()),
            };

            let mut request = self.config.template.clone();
            match &self.config.strategy {
                ProbeStrategy::Range { target_param } => {
                    param::inject_parameter(
                        &mut request,
                        target_param,
                        &candidate,
                        false,
                        self.parser.as_ref(),
                    );
                }
                ProbeStrategy::TokenHarvest => {
                    request.strip_cookies();
                }
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.stats.write().dispatched += 1;
            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(err) if err.is_timeout() => {
                    tracing::debug!(
                        run = %self.run_id,
                        candidate = %candidate,
                        "timeout, reducing sent count and retrying"
                    );
                    self.stats.write().retried += 1;
                    queued = Some(candidate);
                    continue;
                }
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    tracing::error!(
                        run = %self.run_id,
                        candidate = %candidate,
                        error = %err,
                        "dispatch failed, skipping candidate"
                    );
                    self.stats.write().skipped += 1;
                    let err: ProbeError = err.into();
                    self.sink.on_error(&candidate, &err);
                    continue;
                }
            };

            let verdict = self.config.classifier.classify(&response.body_text());
            let result = ProbeResult {
                seq,
                candidate,
                verdict,
                response,
                sent_request: request,
            };
            seq += 1;
            self.stats.write().completed += 1;

            self.results.write().push(result.clone());
            self.sink.on_result(&result);

            // Fire-and-forget: history failures never touch the run.
            if let Err(err) = self
                .history
                .record(&result.sent_request, Some(&result.response))
            {
                tracing::warn!(run = %self.run_id, error = %err, "failed to persist sent probe");
            }
        }
    }

    /// Park while Paused. Signal-based: `resume()`/`stop()` flip the
    /// watch channel and wake this immediately, with no polling.
    async fn wait_while_paused(&mut self) -> RunState {
        loop {
            let state = *self.state_rx.borrow_and_update();
            if state != RunState::Paused {
                return state;
            }
            if self.state_rx.changed().await.is_err() {
                return RunState::Stopping;
            }
        }
    }
}
