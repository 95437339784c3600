// # Interface Source Trait
//
// Defines the interface for reading the live IPv6 address bound to a local
// network interface.
//
// ## Implementations
//
// - getifaddrs-based (unix): `ddns-host-net` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::InterfaceSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* InterfaceSource implementation */;
//
//     let address = source.global_ipv6("eth0").await?;
//     println!("eth0 is reachable at {}", address);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::{Ipv6Addr, SocketAddrV6};

/// Whether an interface address qualifies as the host's published address
///
/// The address must carry no scope (a zero scope id) and must not sit in the
/// link-local range.
pub fn is_global_candidate(address: &SocketAddrV6) -> bool {
    address.scope_id() == 0 && !address.ip().is_unicast_link_local()
}

/// Pick the first qualifying address, in enumeration order
pub fn first_global_candidate<'a, I>(addresses: I) -> Option<Ipv6Addr>
where
    I: IntoIterator<Item = &'a SocketAddrV6>,
{
    addresses
        .into_iter()
        .find(|address| is_global_candidate(address))
        .map(|address| *address.ip())
}

/// Trait for interface address implementations
///
/// Implementations are **observers** only: they read the host's interface
/// table and never decide whether an update is needed.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait InterfaceSource: Send + Sync {
    /// Get the first non-link-local IPv6 address bound to `interface`
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv6Addr)`: The first qualifying address in enumeration order
    /// - `Err(Error::InterfaceNotFound)`: No interface with that name
    /// - `Err(Error::NoGlobalAddress)`: Interface exists, nothing qualifies
    /// - `Err(Error::Enumeration)`: The OS refused to enumerate addresses
    async fn global_ipv6(&self, interface: &str) -> Result<Ipv6Addr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
