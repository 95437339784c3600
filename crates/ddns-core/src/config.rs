//! Configuration types for the DDNS agent
//!
//! This module defines all configuration structures used throughout the workspace.
//! The configuration is loaded once at startup and treated as constant for the
//! lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Default Dynu update endpoint
pub const DEFAULT_UPDATE_ENDPOINT: &str = "https://api.dynu.com/nic/update";

/// One managed alias: the short host name and the interface carrying its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Short host name (the alias under the configured domain)
    pub host_name: String,

    /// Local network interface to read the IPv6 address from (e.g., "eth0")
    pub interface_name: String,
}

impl HostConfig {
    /// Create a new host configuration
    pub fn new(host_name: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            interface_name: interface_name.into(),
        }
    }

    /// Fully-qualified name of this host under `domain`
    pub fn fqdn(&self, domain: &str) -> String {
        format!("{}.{}", self.host_name, domain)
    }
}

impl fmt::Display for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HostConfig[hostName={}, interfaceName={}]",
            self.host_name, self.interface_name
        )
    }
}

/// Main agent configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Provider account user id
    pub user_id: String,

    /// Provider account password (plaintext; only its digest is ever sent)
    pub password: String,

    /// Apex domain the aliases live under
    pub domain: String,

    /// Managed hosts keyed by alias key
    pub hosts: BTreeMap<String, HostConfig>,

    /// Period between reconciliation passes (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Provider endpoint settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

// The password never reaches logs.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("user_id", &self.user_id)
            .field("password", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("hosts", &self.hosts)
            .field("interval_secs", &self.interval_secs)
            .field("provider", &self.provider)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new configuration with defaults and no hosts
    pub fn new(
        user_id: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
            domain: domain.into(),
            hosts: BTreeMap::new(),
            interval_secs: default_interval_secs(),
            provider: ProviderSettings::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Add a managed host under `key`
    pub fn with_host(mut self, key: impl Into<String>, host: HostConfig) -> Self {
        self.hosts.insert(key.into(), host);
        self
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing optional fields take their defaults; the result is not validated.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Reconciliation period
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.user_id.trim().is_empty() {
            return Err(crate::Error::config("User id cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("Password cannot be empty"));
        }
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.hosts.is_empty() {
            return Err(crate::Error::config("No hosts configured"));
        }
        for (key, host) in &self.hosts {
            if host.host_name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Host '{}' has an empty host name",
                    key
                )));
            }
            if host.interface_name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Host '{}' has an empty interface name",
                    key
                )));
            }
        }
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Interval must be > 0"));
        }

        self.provider.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Parse the compact host list form `alias=host@iface,alias2=host2@iface2`
///
/// The `alias=` part is optional; without it the host name doubles as the key.
pub fn parse_hosts(list: &str) -> Result<BTreeMap<String, HostConfig>, crate::Error> {
    let mut hosts = BTreeMap::new();

    for entry in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, rest) = match entry.split_once('=') {
            Some((key, rest)) => (key.trim(), rest.trim()),
            None => {
                let host = entry.split('@').next().unwrap_or(entry).trim();
                (host, entry)
            }
        };

        let (host_name, interface_name) = rest.split_once('@').ok_or_else(|| {
            crate::Error::config(format!(
                "Host entry '{}' must look like alias=host@interface",
                entry
            ))
        })?;

        let host = HostConfig::new(host_name.trim(), interface_name.trim());
        if key.is_empty() || host.host_name.is_empty() || host.interface_name.is_empty() {
            return Err(crate::Error::config(format!(
                "Host entry '{}' has an empty field",
                entry
            )));
        }

        if hosts.insert(key.to_string(), host).is_some() {
            return Err(crate::Error::config(format!("Duplicate host key '{}'", key)));
        }
    }

    Ok(hosts)
}

/// How the credential digest is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, lowercase hex
    #[default]
    Md5,
    /// SHA-256, lowercase hex
    Sha256,
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(crate::Error::config(format!(
                "Unknown digest algorithm '{}'. Supported: md5, sha256",
                other
            ))),
        }
    }
}

/// Whether update calls leave the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Send the update request
    #[default]
    Live,
    /// Build and log the request, never send it
    DryRun,
}

impl std::str::FromStr for UpdateMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "dry-run" | "dry_run" | "dryrun" => Ok(Self::DryRun),
            other => Err(crate::Error::config(format!(
                "Unknown update mode '{}'. Supported: live, dry-run",
                other
            ))),
        }
    }
}

/// Provider endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Update endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Credential digest algorithm
    #[serde(default)]
    pub digest: DigestAlgorithm,

    /// Live or dry-run
    #[serde(default)]
    pub mode: UpdateMode,
}

impl ProviderSettings {
    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Update endpoint must use HTTP or HTTPS scheme. Got: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            digest: DigestAlgorithm::default(),
            mode: UpdateMode::default(),
        }
    }
}

/// Which published address seeds the cache on first sight of a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// First IPv6 answer not scoped to a different interface
    #[default]
    MatchInterface,
    /// First IPv6 answer, unconditionally
    FirstIpv6,
}

impl std::str::FromStr for BaselinePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "match_interface" => Ok(Self::MatchInterface),
            "first_ipv6" => Ok(Self::FirstIpv6),
            other => Err(crate::Error::config(format!(
                "Unknown baseline policy '{}'. Supported: match-interface, first-ipv6",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Baseline selection policy
    #[serde(default)]
    pub baseline_policy: BaselinePolicy,

    /// Upper bound for one interface or name lookup (in seconds)
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Upper bound for one provider update call (in seconds)
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.lookup_timeout_secs == 0 {
            return Err(crate::Error::config("Lookup timeout must be > 0"));
        }
        if self.update_timeout_secs == 0 {
            return Err(crate::Error::config("Update timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline_policy: BaselinePolicy::default(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            update_timeout_secs: default_update_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_endpoint() -> String {
    DEFAULT_UPDATE_ENDPOINT.to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_update_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
