// # Published Resolver Trait
//
// Defines the interface for looking up what DNS currently publishes for a
// managed host. The answer is only used once per host, to seed the address
// cache on first sight.
//
// ## Implementations
//
// - System resolver: `ddns-host-net` crate (delegates to the host resolver)

use async_trait::async_trait;
use std::net::{IpAddr, Ipv6Addr};

use crate::config::BaselinePolicy;

/// One address returned by name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// The resolved address, without any zone suffix
    pub ip: IpAddr,
    /// Name of the interface the address is scoped to, if any
    pub scope_interface: Option<String>,
}

impl ResolvedAddress {
    /// An address with no scope
    pub fn unscoped(ip: IpAddr) -> Self {
        Self {
            ip,
            scope_interface: None,
        }
    }

    /// An address scoped to `interface`
    pub fn scoped(ip: IpAddr, interface: impl Into<String>) -> Self {
        Self {
            ip,
            scope_interface: Some(interface.into()),
        }
    }

    fn ipv6(&self) -> Option<Ipv6Addr> {
        match self.ip {
            IpAddr::V6(ip) => Some(ip),
            IpAddr::V4(_) => None,
        }
    }
}

/// Select the baseline address from resolver answers
///
/// - [`BaselinePolicy::MatchInterface`]: first IPv6 answer that is unscoped or
///   scoped to `interface`; answers scoped to another interface are skipped
/// - [`BaselinePolicy::FirstIpv6`]: first IPv6 answer
///
/// Returns `None` when nothing matches.
pub fn select_baseline(
    policy: BaselinePolicy,
    answers: &[ResolvedAddress],
    interface: &str,
) -> Option<Ipv6Addr> {
    answers
        .iter()
        .filter(|answer| match policy {
            BaselinePolicy::FirstIpv6 => true,
            BaselinePolicy::MatchInterface => answer
                .scope_interface
                .as_deref()
                .is_none_or(|scope| scope == interface),
        })
        .find_map(ResolvedAddress::ipv6)
}

/// Trait for published-address lookups
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait PublishedResolver: Send + Sync {
    /// Resolve a fully-qualified name to all of its addresses
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ResolvedAddress>)`: Every answer, in resolver order
    /// - `Err(Error::Resolution)`: Unknown host or resolver failure
    async fn resolve(&self, fqdn: &str) -> Result<Vec<ResolvedAddress>, crate::Error>;
}
