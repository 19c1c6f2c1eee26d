//! Probe engine
//!
//! Iterate candidate, mutate a cloned request, dispatch, classify,
//! accumulate. Two strategies share the dispatch loop: a character-code
//! range substituted into one parameter, and blind repeated requests
//! that harvest freshly issued tokens.

mod candidates;
mod classify;
mod engine;
mod param;
mod results;
mod sink;

pub use candidates::{Candidates, CharRange, Charset};
pub use classify::{Classifier, Verdict};
pub use engine::{DelayUnit, ProbeConfig, ProbeEngine, ProbeStrategy, RequestDelay, RunState};
pub use param::{
    inject_parameter, serialize_params, serialize_with_value, FormParameterParser, ParameterParser,
};
pub use results::{ProbeResult, ProbeStats, ResultPartitions};
pub use sink::{ChannelSink, HistorySink, NullHistory, ProbeEvent, ProbeSink, RunOutcome};
