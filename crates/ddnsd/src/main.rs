// # ddnsd - DDNS Daemon
//
// The ddnsd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables (or a JSON file)
// 2. Setting up logging and the PID file
// 3. Wiring the host network, resolver and Dynu provider into the engine
// 4. Running the engine until SIGTERM/SIGINT
//
// All reconciliation logic lives in ddns-core.
//
// ## Configuration
//
// ### Account
// - `DDNS_USER_ID`: Dynu user id
// - `DDNS_PASSWORD`: Dynu password (only its digest is sent)
// - `DDNS_DOMAIN`: Apex domain the aliases live under
//
// ### Hosts
// - `DDNS_HOSTS`: `alias=host@interface` entries, comma separated
//
// ### Provider
// - `DDNS_MODE`: `live` (default) or `dry-run`
// - `DDNS_DIGEST`: `md5` (default) or `sha256`
// - `DDNS_UPDATE_ENDPOINT`: Update endpoint URL
//
// ### Engine
// - `DDNS_INTERVAL_SECS`: Seconds between passes (default 60)
// - `DDNS_BASELINE_POLICY`: `match-interface` (default) or `first-ipv6`
// - `DDNS_LOOKUP_TIMEOUT_SECS`: Bound on interface/name lookups
// - `DDNS_UPDATE_TIMEOUT_SECS`: Bound on one update call
//
// ### Process
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `DDNS_PID_FILE`: PID file path (default `ddnsd.pid`; empty disables)
// - `DDNS_CONFIG_FILE`: JSON `ServiceConfig`; replaces the account and host
//   variables, the remaining variables still override it
//
// ## Example
//
// ```bash
// export DDNS_USER_ID=myuser
// export DDNS_PASSWORD=secret
// export DDNS_DOMAIN=example.com
// export DDNS_HOSTS=h1@eth0,nas=storage@eth1
// export DDNS_MODE=dry-run
//
// ddnsd
// ```

mod pid_file;

use anyhow::{Context, Result};
use ddns_core::config::parse_hosts;
use ddns_core::{EngineEvent, ReconcileEngine, ServiceConfig};
use ddns_host_net::{IfAddrsSource, SystemResolver};
use ddns_provider_dynu::DynuProvider;
use pid_file::PidFile;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_PID_FILE: &str = "ddnsd.pid";

/// Upper bound on the engine winding down after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    service: ServiceConfig,
    log_level: String,
    pid_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `var`, which maps a variable name to its value
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut service = match var("DDNS_CONFIG_FILE") {
            Some(path) => ServiceConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load DDNS_CONFIG_FILE {}", path))?,
            None => {
                let required = |key: &str| {
                    var(key).ok_or_else(|| {
                        anyhow::anyhow!("{} is required. Set it via: export {}=...", key, key)
                    })
                };
                let mut service = ServiceConfig::new(
                    required("DDNS_USER_ID")?,
                    required("DDNS_PASSWORD")?,
                    required("DDNS_DOMAIN")?,
                );
                service.hosts = parse_hosts(&required("DDNS_HOSTS")?)?;
                service
            }
        };

        if let Some(value) = var("DDNS_INTERVAL_SECS") {
            service.interval_secs = parse_number("DDNS_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = var("DDNS_MODE") {
            service.provider.mode = value.parse()?;
        }
        if let Some(value) = var("DDNS_DIGEST") {
            service.provider.digest = value.parse()?;
        }
        if let Some(value) = var("DDNS_UPDATE_ENDPOINT") {
            service.provider.endpoint = value;
        }
        if let Some(value) = var("DDNS_BASELINE_POLICY") {
            service.engine.baseline_policy = value.parse()?;
        }
        if let Some(value) = var("DDNS_LOOKUP_TIMEOUT_SECS") {
            service.engine.lookup_timeout_secs = parse_number("DDNS_LOOKUP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("DDNS_UPDATE_TIMEOUT_SECS") {
            service.engine.update_timeout_secs = parse_number("DDNS_UPDATE_TIMEOUT_SECS", &value)?;
        }

        let pid_file = match var("DDNS_PID_FILE") {
            Some(path) if path.is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_PID_FILE)),
        };

        Ok(Self {
            service,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            pid_file,
        })
    }

    /// Validate the configuration
    ///
    /// On top of the engine's own checks this validates the domain and every
    /// alias FQDN as DNS names, and the log level.
    fn validate(&self) -> Result<()> {
        self.service.validate()?;

        self.validate_domain_name(&self.service.domain)?;
        for host in self.service.hosts.values() {
            self.validate_domain_name(&host.fqdn(&self.service.domain))?;
        }

        // Credentials travel in the query string
        if self.service.provider.endpoint.starts_with("http://") {
            eprintln!(
                "WARNING: DDNS_UPDATE_ENDPOINT uses HTTP (not HTTPS). \
                      Credentials will be sent unencrypted."
            );
        }

        if !(10..=86400).contains(&self.service.interval_secs) {
            anyhow::bail!(
                "DDNS_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                self.service.interval_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Validate that a string is a valid domain name
    ///
    /// This implements basic DNS domain name validation per RFC 1035.
    /// It's not comprehensive but catches common errors.
    fn validate_domain_name(&self, domain: &str) -> Result<()> {
        if domain.is_empty() {
            anyhow::bail!("Domain name cannot be empty");
        }

        // Total length limit (RFC 1035: 253 chars max)
        if domain.len() > 253 {
            anyhow::bail!(
                "Domain name too long: {} chars (max 253). Got: {}",
                domain.len(),
                domain
            );
        }

        for label in domain.split('.') {
            if label.is_empty() {
                anyhow::bail!("Domain name has empty label: '{}'", domain);
            }

            if label.len() > 63 {
                anyhow::bail!(
                    "Domain label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                );
            }

            if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
                anyhow::bail!(
                    "Domain label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric and hyphen only.",
                    label
                );
            }

            if label.starts_with('-') || label.ends_with('-') {
                anyhow::bail!(
                    "Domain label cannot start or end with hyphen. Label: '{}'",
                    label
                );
            }
        }

        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds. Got: '{}'", key, value))
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    info!("Configuration loaded: {} host(s)", config.service.hosts.len());
    debug!("{:?}", config.service);

    let _pid_file = match config.pid_file.as_ref().map(PidFile::create).transpose() {
        Ok(guard) => guard,
        Err(e) => {
            error!("{:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let engine = match build_engine(&config.service) {
            Ok(engine) => engine,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the host collaborators and the provider into an engine
fn build_engine(
    service: &ServiceConfig,
) -> Result<(ReconcileEngine, mpsc::Receiver<EngineEvent>)> {
    let provider = DynuProvider::from_config(service).context("Failed to create Dynu provider")?;
    info!("Provider: {:?}", provider);

    for (key, host) in &service.hosts {
        info!("Managing {} -> {}", key, host);
    }

    let engine = ReconcileEngine::new(
        Box::new(IfAddrsSource::new()),
        Box::new(SystemResolver::new()),
        Box::new(provider),
        service,
    )?;

    Ok(engine)
}

/// Run the engine until a shutdown signal arrives
async fn run_daemon(
    (engine, event_rx): (ReconcileEngine, mpsc::Receiver<EngineEvent>),
) -> Result<()> {
    let events = tokio::spawn(log_events(event_rx));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut engine_task = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
            info!("Shutting down daemon");

            let _ = shutdown_tx.send(());
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut engine_task).await {
                Ok(joined) => joined.context("Engine task panicked")??,
                Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
            }
        }
        joined = &mut engine_task => {
            joined.context("Engine task panicked")??;
            warn!("Engine stopped without a shutdown signal");
        }
    }

    // The engine owned the sender; the logger drains and exits
    let _ = events.await;
    Ok(())
}

/// Forward engine events to the log
async fn log_events(mut event_rx: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            EngineEvent::PassCompleted { report } => debug!(
                "Pass completed: {} updated, {} unchanged, {} skipped, {} failed",
                report.updated, report.unchanged, report.skipped, report.failed
            ),
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
