//! sonda - HTTP field enumeration and token harvesting probe
//!
//! Brute-forces one request parameter over a character-code range, or
//! fires blind repeated requests to harvest server-issued tokens, and
//! classifies every response against a rejection signature.

mod app;
mod error;
mod http;
mod probe;
mod reporting;
mod session;

pub use error::*;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::Config;
use crate::http::{ProbeRequest, ReqwestTransport};
use crate::probe::{
    ChannelSink, FormParameterParser, HistorySink, NullHistory, ProbeConfig, ProbeEngine,
    ProbeEvent,
};
use crate::session::SessionHistory;

/// HTTP field enumeration and token harvesting probe
#[derive(Parser, Debug)]
#[command(name = "sonda")]
#[command(author, version, about = "HTTP field enumeration and token harvesting probe", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SONDA_CONFIG")]
    config: Option<String>,

    /// Target URL
    #[arg(long)]
    url: Option<String>,

    /// HTTP method
    #[arg(long, default_value = "POST")]
    method: String,

    /// Form parameter as NAME=VALUE (repeatable, order preserved)
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Extra header as NAME:VALUE (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Parameter to enumerate
    #[arg(long)]
    target_param: Option<String>,

    /// Rejection signature regex
    #[arg(long)]
    signature: Option<String>,

    /// First character code, inclusive
    #[arg(long)]
    range_start: Option<u32>,

    /// Last character code, exclusive
    #[arg(long)]
    range_end: Option<u32>,

    /// Literal prepended to every candidate
    #[arg(long)]
    prefix: Option<String>,

    /// Literal appended to every candidate
    #[arg(long)]
    postfix: Option<String>,

    /// Character set when no explicit range is given (ascii, extended, wide)
    #[arg(long)]
    charset: Option<String>,

    /// Number of blind token requests (switches to token harvesting)
    #[arg(long)]
    tokens: Option<usize>,

    /// Delay between requests
    #[arg(long)]
    delay: Option<u64>,

    /// Delay unit (ms, s, m)
    #[arg(long)]
    delay_unit: Option<String>,

    /// Write a CSV report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Disable history persistence
    #[arg(long)]
    no_history: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SONDA_LOG_LEVEL")]
    log_level: String,

    /// Log file path (enables file logging)
    #[arg(long, env = "SONDA_LOG_FILE")]
    log_file: Option<String>,

    /// Enable JSON structured logging
    #[arg(long, env = "SONDA_LOG_JSON")]
    log_json: bool,

    /// Generate default configuration and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        return generate_default_config();
    }

    init_logging(&cli)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting sonda");

    let config = load_config(&cli)?;
    validate_config(&config)?;

    let url = cli.url.clone().context("--url is required")?;
    let parser = Arc::new(FormParameterParser);
    let template = build_template(&cli, &url, parser.as_ref())?;

    let transport = Arc::new(ReqwestTransport::new(&config.http)?);
    let history: Arc<dyn HistorySink> = if cli.no_history {
        Arc::new(NullHistory)
    } else {
        let path = config
            .general
            .history_file
            .clone()
            .unwrap_or_else(SessionHistory::default_path);
        Arc::new(SessionHistory::open(path, config.general.max_history_items))
    };

    let engine = Arc::new(ProbeEngine::new(transport, parser, history));
    let probe_config = ProbeConfig::from_options(&config.probe, template)?;
    let (sink, mut events) = ChannelSink::new();

    engine.start(probe_config, Arc::new(sink))?;

    // Ctrl+C requests cooperative cancellation; the in-flight dispatch
    // completes and the run winds down through the normal path.
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping probe run");
                engine.stop();
            }
        });
    }

    let mut fatal = None;
    while let Some(event) = events.recv().await {
        match event {
            ProbeEvent::Result(result) => {
                println!(
                    "{}\t{}\t{}",
                    result.candidate,
                    result.verdict.as_str(),
                    result.response.status
                );
            }
            ProbeEvent::Error { candidate, message } => {
                tracing::warn!(candidate = %candidate, "{}", message);
            }
            ProbeEvent::Completed(outcome) => {
                fatal = outcome.fatal.clone();
                break;
            }
        }
    }
    engine.join().await;

    let results = engine.results();
    let stats = engine.stats();
    println!();
    println!(
        "Whitelist ({}): {}",
        results.whitelist.len(),
        results.whitelisted_values().join(", ")
    );
    println!(
        "Blacklist ({}): {}",
        results.blacklist.len(),
        results.blacklisted_values().join(", ")
    );
    if stats.skipped > 0 {
        println!("Skipped on transport errors: {}", stats.skipped);
    }

    if config.probe.number_tokens > 0 {
        let harvested: Vec<String> = results
            .candidates_in_order()
            .iter()
            .flat_map(|r| r.response.set_cookies())
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();
        println!("Harvested tokens ({}): {}", harvested.len(), harvested.join(", "));
    }

    if let Some(path) = &cli.report {
        let metadata = reporting::ReportMetadata::new(&url);
        reporting::write_csv(&metadata, &results, path)?;
    }

    if let Some(error) = fatal {
        anyhow::bail!("Probe run aborted: {}", error);
    }

    Ok(())
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(log_path) = &cli.log_file {
        let path = std::path::Path::new(log_path);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => std::path::Path::new("."),
        };
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("sonda.log");
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, filename);

        if cli.log_json {
            subscriber
                .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
                .init();
        } else {
            subscriber
                .with(fmt::layer().with_writer(file_appender).with_ansi(false))
                .init();
        }
    } else if cli.log_json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Results go to stdout; keep logs off it.
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Load configuration with CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    let probe = &mut config.probe;
    if let Some(v) = &cli.target_param {
        probe.target_param = Some(v.clone());
    }
    if let Some(v) = &cli.signature {
        probe.signature = Some(v.clone());
    }
    if let Some(v) = cli.range_start {
        probe.range_start = Some(v);
    }
    if let Some(v) = cli.range_end {
        probe.range_end = Some(v);
    }
    if let Some(v) = &cli.prefix {
        probe.prefix = Some(v.clone());
    }
    if let Some(v) = &cli.postfix {
        probe.postfix = Some(v.clone());
    }
    if let Some(v) = &cli.charset {
        probe.charset = v.clone();
    }
    if let Some(v) = cli.tokens {
        probe.number_tokens = v;
    }
    if let Some(v) = cli.delay {
        probe.delay_duration = v;
    }
    if let Some(v) = &cli.delay_unit {
        probe.delay_unit = v.clone();
    }

    Ok(config)
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.http.request_timeout == 0 {
        anyhow::bail!("http.request_timeout must be greater than 0");
    }

    if config.general.max_history_items == 0 {
        anyhow::bail!("general.max_history_items must be greater than 0");
    }

    Ok(())
}

/// Build the request template from CLI arguments
fn build_template(
    cli: &Cli,
    url: &str,
    parser: &FormParameterParser,
) -> Result<ProbeRequest> {
    let mut builder = ProbeRequest::builder().method(&cli.method).url(url);

    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Invalid header '{}', expected NAME:VALUE", header))?;
        builder = builder.header(name.trim(), value.trim());
    }

    for param in &cli.params {
        let (name, value) = param
            .split_once('=')
            .with_context(|| format!("Invalid parameter '{}', expected NAME=VALUE", param))?;
        builder = builder.form_param(name, value);
    }

    let mut request = builder.build();
    if !request.form_params.is_empty() && request.method != "GET" {
        let body = probe::serialize_params(&request.form_params, parser);
        request.set_body(body);
    }

    Ok(request)
}

/// Generate default configuration file
fn generate_default_config() -> Result<()> {
    let config = Config::default();
    let toml = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

    println!("{}", toml);
    Ok(())
}
