//! Test doubles and common utilities for engine contract tests
//!
//! Every double is cheaply cloneable and shares its counters across clones, so
//! a test can hand one clone to the engine and keep another for assertions.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    DnsProvider, InterfaceSource, PublishedResolver, ResolvedAddress, UpdateOutcome,
    UpdateRequest,
};
use ddns_core::{HostConfig, ServiceConfig};
use std::collections::{HashMap, HashSet};
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Parse an IPv6 literal
pub fn ip(s: &str) -> Ipv6Addr {
    s.parse().expect("valid IPv6 literal")
}

/// What an interface currently looks like
#[derive(Debug, Clone, Copy)]
pub enum Live {
    Address(Ipv6Addr),
    NoGlobal,
    Broken,
}

/// An InterfaceSource whose answers the test controls
#[derive(Clone, Default)]
pub struct ControlledInterfaces {
    interfaces: Arc<Mutex<HashMap<String, Live>>>,
    call_count: Arc<AtomicUsize>,
}

impl ControlledInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `address` on `interface` (creating the interface if needed)
    pub fn set(&self, interface: &str, address: Ipv6Addr) {
        self.set_state(interface, Live::Address(address));
    }

    pub fn set_state(&self, interface: &str, state: Live) {
        self.interfaces
            .lock()
            .unwrap()
            .insert(interface.to_string(), state);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InterfaceSource for ControlledInterfaces {
    async fn global_ipv6(&self, interface: &str) -> Result<Ipv6Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match self.interfaces.lock().unwrap().get(interface).copied() {
            Some(Live::Address(address)) => Ok(address),
            Some(Live::NoGlobal) => Err(Error::no_global_address(interface)),
            Some(Live::Broken) => Err(Error::enumeration("getifaddrs: EPERM")),
            None => Err(Error::interface_not_found(interface)),
        }
    }

    fn source_name(&self) -> &'static str {
        "controlled"
    }
}

/// An InterfaceSource that never answers
#[derive(Clone, Default)]
pub struct HangingInterfaces;

#[async_trait::async_trait]
impl InterfaceSource for HangingInterfaces {
    async fn global_ipv6(&self, _interface: &str) -> Result<Ipv6Addr> {
        std::future::pending().await
    }

    fn source_name(&self) -> &'static str {
        "hanging"
    }
}

/// A PublishedResolver with canned answers that counts lookups
#[derive(Clone, Default)]
pub struct CountingResolver {
    answers: Arc<Mutex<HashMap<String, Vec<ResolvedAddress>>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl CountingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `address` for `fqdn`, scoped to `interface`
    pub fn publish(&self, fqdn: &str, address: Ipv6Addr, interface: &str) {
        self.answers
            .lock()
            .unwrap()
            .entry(fqdn.to_string())
            .or_default()
            .push(ResolvedAddress::scoped(address.into(), interface));
    }

    /// Publish an unscoped answer for `fqdn`
    pub fn publish_unscoped(&self, fqdn: &str, address: std::net::IpAddr) {
        self.answers
            .lock()
            .unwrap()
            .entry(fqdn.to_string())
            .or_default()
            .push(ResolvedAddress::unscoped(address));
    }

    /// Number of lookups for `fqdn`
    pub fn lookups_for(&self, fqdn: &str) -> usize {
        self.lookups
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.as_str() == fqdn)
            .count()
    }

    pub fn total_lookups(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl PublishedResolver for CountingResolver {
    async fn resolve(&self, fqdn: &str) -> Result<Vec<ResolvedAddress>> {
        self.lookups.lock().unwrap().push(fqdn.to_string());
        self.answers
            .lock()
            .unwrap()
            .get(fqdn)
            .cloned()
            .ok_or_else(|| Error::resolution(format!("unknown host {}", fqdn)))
    }
}

/// A DnsProvider that records every update call
#[derive(Clone, Default)]
pub struct RecordingProvider {
    requests: Arc<Mutex<Vec<UpdateRequest>>>,
    digest_failures: Arc<Mutex<HashSet<String>>>,
    transport_failures: Arc<Mutex<HashSet<String>>>,
    dry_run: bool,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Make the credential digest fail for `alias`
    pub fn fail_digest_for(&self, alias: &str) {
        self.digest_failures
            .lock()
            .unwrap()
            .insert(alias.to_string());
    }

    /// Make the transport fail for `alias`
    pub fn fail_transport_for(&self, alias: &str) {
        self.transport_failures
            .lock()
            .unwrap()
            .insert(alias.to_string());
    }

    /// Let calls for `alias` succeed again
    pub fn heal(&self, alias: &str) {
        self.digest_failures.lock().unwrap().remove(alias);
        self.transport_failures.lock().unwrap().remove(alias);
    }

    /// Successfully issued requests
    pub fn requests(&self) -> Vec<UpdateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn update_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingProvider {
    async fn update_alias(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        if self.digest_failures.lock().unwrap().contains(&request.alias) {
            return Err(Error::digest("digest algorithm unavailable"));
        }
        if self.transport_failures.lock().unwrap().contains(&request.alias) {
            return Err(Error::http("connection refused"));
        }

        self.requests.lock().unwrap().push(request.clone());
        if self.dry_run {
            Ok(UpdateOutcome::DryRun)
        } else {
            Ok(UpdateOutcome::Sent { status: 200 })
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// A DnsProvider that blocks every call until released
#[derive(Clone, Default)]
pub struct GatedProvider {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    call_count: Arc<AtomicUsize>,
}

impl GatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a call is parked inside the provider
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked call finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for GatedProvider {
    async fn update_alias(&self, _request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(UpdateOutcome::Sent { status: 200 })
    }

    fn provider_name(&self) -> &'static str {
        "gated"
    }
}

/// A DnsProvider whose update calls never complete
#[derive(Clone, Default)]
pub struct HangingProvider {
    call_count: Arc<AtomicUsize>,
}

impl HangingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for HangingProvider {
    async fn update_alias(&self, _request: &UpdateRequest) -> Result<UpdateOutcome> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn provider_name(&self) -> &'static str {
        "hanging"
    }
}

/// Minimal valid configuration for `example.com` with the given (host, interface) pairs
pub fn config_for(hosts: &[(&str, &str)]) -> ServiceConfig {
    hosts.iter().fold(
        ServiceConfig::new("user", "secret", "example.com"),
        |config, (host, interface)| config.with_host(*host, HostConfig::new(*host, *interface)),
    )
}
