//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Reading the live IPv6 address of each host's interface via InterfaceSource
//! - Seeding the address cache from DNS the first time a host is seen
//! - Deciding whether the published address needs to change
//! - Issuing the update via DnsProvider and recording the new address
//!
//! ## Architecture
//!
//! ```text
//!   interval tick
//!        │
//!        ▼
//! ┌──────────────────┐       ┌──────────────────┐
//! │ ReconcileEngine  │──────▶│ InterfaceSource  │ live address
//! │  (one pass at a  │       └──────────────────┘
//! │   time, per host)│       ┌──────────────────┐
//! │                  │──────▶│ PublishedResolver│ baseline (first sight only)
//! │  AddressCache    │       └──────────────────┘
//! │  (behind a lock) │       ┌──────────────────┐
//! │                  │──────▶│ DnsProvider      │ update (on change only)
//! └──────────────────┘       └──────────────────┘
//!        │
//!        ▼
//!   EngineEvent channel
//! ```
//!
//! ## Per-host State Machine
//!
//! 1. Live address lookup fails → host skipped, cache untouched
//! 2. No cache entry → resolve the DNS baseline once and store it (even if absent)
//! 3. Live address equals cached value → nothing to do
//! 4. Otherwise → one update call; on success the cache holds the live address

use crate::cache::AddressCache;
use crate::config::{BaselinePolicy, HostConfig, ServiceConfig};
use crate::error::{Error, Result};
use crate::traits::{
    DnsProvider, InterfaceSource, PublishedResolver, UpdateOutcome, UpdateRequest,
    select_baseline,
};
use std::future::Future;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        hosts_count: usize,
        interval_secs: u64,
    },

    /// A reconciliation pass started
    PassStarted {
        hosts_count: usize,
    },

    /// A trigger fired while a previous pass was still running
    PassSkipped,

    /// No live address for a host this pass
    HostSkipped {
        host_name: String,
        reason: String,
    },

    /// First sight of a host: cache seeded from DNS
    BaselineSeeded {
        host_name: String,
        baseline: Option<Ipv6Addr>,
    },

    /// Live address matches the cached one
    NoChange {
        host_name: String,
        address: Ipv6Addr,
    },

    /// Update call issued and cache moved to the new address
    UpdateIssued {
        host_name: String,
        address: Ipv6Addr,
        previous: Option<Ipv6Addr>,
        dry_run: bool,
    },

    /// Update call failed; cache left as it was
    UpdateFailed {
        host_name: String,
        address: Ipv6Addr,
        error: String,
    },

    /// A reconciliation pass finished
    PassCompleted {
        report: PassReport,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// What happened to one host during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOutcome {
    /// No live address was found
    Skipped,
    /// Live address matched the cache
    Unchanged,
    /// Update call issued
    Updated,
    /// Update call failed
    UpdateFailed,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// True when the trigger was dropped because another pass held the cache
    pub pass_skipped: bool,
    /// Hosts with no live address
    pub skipped: usize,
    /// Hosts whose address did not change
    pub unchanged: usize,
    /// Hosts updated
    pub updated: usize,
    /// Hosts whose update failed
    pub failed: usize,
}

impl PassReport {
    fn skipped_pass() -> Self {
        Self {
            pass_skipped: true,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: HostOutcome) {
        match outcome {
            HostOutcome::Skipped => self.skipped += 1,
            HostOutcome::Unchanged => self.unchanged += 1,
            HostOutcome::Updated => self.updated += 1,
            HostOutcome::UpdateFailed => self.failed += 1,
        }
    }

    /// Number of hosts visited
    pub fn hosts(&self) -> usize {
        self.skipped + self.unchanged + self.updated + self.failed
    }
}

/// Core reconciliation engine
///
/// The engine owns the address cache and drives one pass per interval tick.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Start with [`ReconcileEngine::run()`]
/// 3. Engine runs until shutdown signal received
///
/// ## Concurrency
///
/// At most one pass runs at a time. A pass holds the cache lock for its whole
/// duration; [`ReconcileEngine::reconcile_once()`] called while another pass is
/// in flight returns immediately with [`PassReport::pass_skipped`] set.
pub struct ReconcileEngine {
    /// Source of live interface addresses
    interfaces: Box<dyn InterfaceSource>,

    /// Resolver for the published baseline
    resolver: Box<dyn PublishedResolver>,

    /// DNS provider for updates
    provider: Box<dyn DnsProvider>,

    /// Last-known address per host name
    cache: Mutex<AddressCache>,

    /// Apex domain
    domain: String,

    /// Managed hosts, in key order
    hosts: Vec<(String, HostConfig)>,

    /// Period between passes
    interval: Duration,

    /// Baseline selection policy
    baseline_policy: BaselinePolicy,

    /// Bound on each interface or name lookup
    lookup_timeout: Duration,

    /// Bound on each update call
    update_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new reconciliation engine
    ///
    /// # Parameters
    ///
    /// - `interfaces`: Interface address source
    /// - `resolver`: Published-address resolver
    /// - `provider`: DNS provider implementation
    /// - `config`: Agent configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        interfaces: Box<dyn InterfaceSource>,
        resolver: Box<dyn PublishedResolver>,
        provider: Box<dyn DnsProvider>,
        config: &ServiceConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            interfaces,
            resolver,
            provider,
            cache: Mutex::new(AddressCache::new()),
            domain: config.domain.clone(),
            hosts: config
                .hosts
                .iter()
                .map(|(key, host)| (key.clone(), host.clone()))
                .collect(),
            interval: config.interval(),
            baseline_policy: config.engine.baseline_policy,
            lookup_timeout: Duration::from_secs(config.engine.lookup_timeout_secs),
            update_timeout: Duration::from_secs(config.engine.update_timeout_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// Runs one pass immediately, then one per interval, until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// A pass that is still running when the signal arrives is dropped; the
    /// host being processed keeps its previous cache entry.
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            hosts_count: self.hosts.len(),
            interval_secs: self.interval.as_secs(),
        });
        info!(
            "Reconciliation engine started: {} host(s), every {:?}, provider {}, source {}",
            self.hosts.len(),
            self.interval,
            self.provider.provider_name(),
            self.interfaces.source_name()
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for ctrl-c: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break,
            }

            // A pass in flight does not delay shutdown
            tokio::select! {
                report = self.reconcile_once() => {
                    debug!("Pass finished: {:?}", report);
                }
                _ = &mut shutdown => {
                    warn!("Shutdown signal received during a pass, abandoning it");
                    break;
                }
            }
        }

        info!("Shutdown signal received");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
        info!("Engine stopped");
        Ok(())
    }

    /// Run one reconciliation pass over every configured host
    ///
    /// Never fails: per-host problems are logged, reported in the
    /// [`PassReport`], and the pass moves on to the next host.
    pub async fn reconcile_once(&self) -> PassReport {
        let Ok(mut cache) = self.cache.try_lock() else {
            warn!("Previous pass still running, skipping this trigger");
            self.emit_event(EngineEvent::PassSkipped);
            return PassReport::skipped_pass();
        };

        info!("Checking for IP updates: {} host(s)", self.hosts.len());
        self.emit_event(EngineEvent::PassStarted {
            hosts_count: self.hosts.len(),
        });

        let mut report = PassReport::default();
        for (key, host) in &self.hosts {
            debug!("Processing host entry '{}': {}", key, host);
            let outcome = self.reconcile_host(&mut cache, host).await;
            report.record(outcome);
        }

        drop(cache);

        self.emit_event(EngineEvent::PassCompleted { report });
        report
    }

    /// Last-known address for a host, if it has a cache entry
    ///
    /// Waits for a running pass to finish.
    pub async fn cached_address(&self, host_name: &str) -> Option<Option<Ipv6Addr>> {
        self.cache.lock().await.get(host_name)
    }

    async fn reconcile_host(&self, cache: &mut AddressCache, host: &HostConfig) -> HostOutcome {
        info!("Processing {}", host.host_name);

        let live = match self.lookup_live(host).await {
            Ok(address) => address,
            Err(e) => {
                if e.is_address_absent() {
                    warn!("Skipping {} this pass: {}", host.host_name, e);
                } else {
                    error!("Skipping {} this pass: {}", host.host_name, e);
                }
                self.emit_event(EngineEvent::HostSkipped {
                    host_name: host.host_name.clone(),
                    reason: e.to_string(),
                });
                return HostOutcome::Skipped;
            }
        };
        info!("{} has live address {}", host.host_name, live);

        let previous = match cache.get(&host.host_name) {
            Some(previous) => previous,
            None => {
                let baseline = self.lookup_baseline(host).await;
                cache.insert(host.host_name.clone(), baseline);
                self.emit_event(EngineEvent::BaselineSeeded {
                    host_name: host.host_name.clone(),
                    baseline,
                });
                baseline
            }
        };

        if previous == Some(live) {
            info!("No change detected in IP address for {}", host.host_name);
            self.emit_event(EngineEvent::NoChange {
                host_name: host.host_name.clone(),
                address: live,
            });
            return HostOutcome::Unchanged;
        }

        let request = UpdateRequest::new(self.domain.clone(), host.host_name.clone(), live);
        info!(
            "Updating DNS alias {} (previous: {})",
            request,
            previous.map(|ip| ip.to_string()).unwrap_or("unknown".to_string())
        );

        match self.issue_update(&request).await {
            Ok(outcome) => {
                cache.insert(host.host_name.clone(), Some(live));
                self.emit_event(EngineEvent::UpdateIssued {
                    host_name: host.host_name.clone(),
                    address: live,
                    previous,
                    dry_run: outcome == UpdateOutcome::DryRun,
                });
                HostOutcome::Updated
            }
            Err(e) => {
                error!("Failed to update {}: {}", request, e);
                self.emit_event(EngineEvent::UpdateFailed {
                    host_name: host.host_name.clone(),
                    address: live,
                    error: e.to_string(),
                });
                HostOutcome::UpdateFailed
            }
        }
    }

    async fn lookup_live(&self, host: &HostConfig) -> Result<Ipv6Addr> {
        bounded(
            self.lookup_timeout,
            format!("interface lookup for {}", host.interface_name),
            self.interfaces.global_ipv6(&host.interface_name),
        )
        .await
    }

    /// Resolve the published baseline; every failure collapses to `None`
    async fn lookup_baseline(&self, host: &HostConfig) -> Option<Ipv6Addr> {
        let fqdn = host.fqdn(&self.domain);

        let answers = match bounded(
            self.lookup_timeout,
            format!("name lookup for {}", fqdn),
            self.resolver.resolve(&fqdn),
        )
        .await
        {
            Ok(answers) => answers,
            Err(e) => {
                error!("Can't find IP address for host {}: {}", fqdn, e);
                return None;
            }
        };

        let baseline = select_baseline(self.baseline_policy, &answers, &host.interface_name);
        match baseline {
            Some(ip) => debug!("Published baseline for {}: {}", fqdn, ip),
            None => warn!(
                "No published IPv6 address for {} matched policy {:?} ({} answer(s))",
                fqdn,
                self.baseline_policy,
                answers.len()
            ),
        }
        baseline
    }

    async fn issue_update(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        bounded(
            self.update_timeout,
            format!("update call for {}", request),
            self.provider.update_alias(request),
        )
        .await
        .map_err(|e| match e {
            Error::Digest(_) | Error::Timeout(_) => e,
            other => Error::provider(self.provider.provider_name(), other.to_string()),
        })
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Full channel: drop the event rather than grow without bound
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Await `fut` for at most `limit`
async fn bounded<T, F>(limit: Duration, what: String, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(format!("{} after {:?}", what, limit))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_report_counts() {
        let mut report = PassReport::default();
        report.record(HostOutcome::Updated);
        report.record(HostOutcome::Skipped);
        report.record(HostOutcome::Unchanged);

        assert_eq!(report.hosts(), 3);
        assert_eq!(report.updated, 1);
        assert!(!report.pass_skipped);
        assert!(PassReport::skipped_pass().pass_skipped);
    }
}
