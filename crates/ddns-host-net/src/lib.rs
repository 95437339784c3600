// # Host Network Integration
//
// This crate connects the DDNS agent to the host it runs on:
//
// - [`IfAddrsSource`]: reads interface addresses with `getifaddrs(3)`
// - [`SystemResolver`]: resolves published names with the host resolver
//
// ## Platform Support
//
// Interface enumeration needs the unix `getifaddrs`/`if_nametoindex` family.
// On other targets `IfAddrsSource` reports an enumeration error for every
// lookup, and the resolver reports scope ids numerically.

#[cfg(unix)]
mod sys;

use async_trait::async_trait;
use ddns_core::traits::{InterfaceSource, PublishedResolver, ResolvedAddress};
use ddns_core::{Error, Result};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Interface address source backed by `getifaddrs(3)`
///
/// The enumeration is a blocking system call, so it runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfAddrsSource;

impl IfAddrsSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InterfaceSource for IfAddrsSource {
    async fn global_ipv6(&self, interface: &str) -> Result<Ipv6Addr> {
        let interface = interface.to_string();
        tokio::task::spawn_blocking(move || lookup_global_ipv6(&interface))
            .await
            .map_err(|e| Error::enumeration(format!("enumeration task failed: {}", e)))?
    }

    fn source_name(&self) -> &'static str {
        "getifaddrs"
    }
}

#[cfg(unix)]
fn lookup_global_ipv6(interface: &str) -> Result<Ipv6Addr> {
    use ddns_core::traits::first_global_candidate;

    if sys::interface_index(interface).is_none() {
        return Err(Error::interface_not_found(interface));
    }

    let addresses = sys::ipv6_addresses()
        .map_err(|e| Error::enumeration(format!("getifaddrs failed: {}", e)))?;

    let on_interface: Vec<_> = addresses
        .into_iter()
        .filter(|entry| entry.name == interface)
        .map(|entry| {
            tracing::debug!("Checking IP {} on {}", entry.address, interface);
            entry.address
        })
        .collect();

    let address = first_global_candidate(&on_interface)
        .ok_or_else(|| Error::no_global_address(interface))?;
    tracing::debug!("Found global IPv6 address {} on {}", address, interface);
    Ok(address)
}

#[cfg(not(unix))]
fn lookup_global_ipv6(_interface: &str) -> Result<Ipv6Addr> {
    Err(Error::enumeration(
        "interface enumeration is only supported on unix targets",
    ))
}

/// Published-address resolver backed by the host's name resolution
///
/// Delegates to `getaddrinfo` through `tokio::net::lookup_host`; no DNS
/// protocol is spoken here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PublishedResolver for SystemResolver {
    async fn resolve(&self, fqdn: &str) -> Result<Vec<ResolvedAddress>> {
        let answers = tokio::net::lookup_host(format!("{}:0", fqdn))
            .await
            .map_err(|e| Error::resolution(format!("{}: {}", fqdn, e)))?;

        Ok(answers
            .map(|answer| match answer {
                SocketAddr::V4(v4) => ResolvedAddress::unscoped(IpAddr::V4(*v4.ip())),
                SocketAddr::V6(v6) => ResolvedAddress {
                    ip: IpAddr::V6(*v6.ip()),
                    scope_interface: scope_name(v6.scope_id()),
                },
            })
            .collect())
    }
}

/// Interface name for a scope id; unscoped answers have none
#[cfg(unix)]
fn scope_name(scope_id: u32) -> Option<String> {
    (scope_id != 0)
        .then(|| sys::interface_name(scope_id).unwrap_or_else(|| scope_id.to_string()))
}

#[cfg(not(unix))]
fn scope_name(scope_id: u32) -> Option<String> {
    (scope_id != 0).then(|| scope_id.to_string())
}
