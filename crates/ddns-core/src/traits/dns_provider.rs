// # DNS Provider Trait
//
// Defines the interface for pushing a new address to a dynamic DNS provider.
//
// ## Implementations
//
// - Dynu: `ddns-provider-dynu` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, UpdateRequest};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider
//         .update_alias(&UpdateRequest::new("example.com", "h1", "2001:db8::2".parse()?))
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv6Addr;

/// One alias update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Apex domain (sent as `hostname`)
    pub domain: String,
    /// Short host name (sent as `alias`)
    pub alias: String,
    /// The new address
    pub address: Ipv6Addr,
}

impl UpdateRequest {
    /// Create a new update request
    pub fn new(domain: impl Into<String>, alias: impl Into<String>, address: Ipv6Addr) -> Self {
        Self {
            domain: domain.into(),
            alias: alias.into(),
            address,
        }
    }
}

impl fmt::Display for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.alias, self.domain, self.address)
    }
}

/// Result of an update call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The request left the host; the response status is informational only
    Sent {
        /// HTTP status code of the response
        status: u16,
    },
    /// Dry-run mode: the request was built and logged, not sent
    DryRun,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// Providers are isolated, stateless and single-shot:
///
/// - ✅ Perform one HTTP call to their endpoint per invocation
/// - ✅ Compute credentials for that call
/// - ❌ Retry or back off (the next scheduled pass re-attempts)
/// - ❌ Touch the address cache (owned by `ReconcileEngine`)
/// - ❌ Decide whether an update is needed (owned by `ReconcileEngine`)
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Push `request.address` for `request.alias` under `request.domain`
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome)`: The call was issued (or logged, in dry-run mode)
    /// - `Err(Error::Digest)`: The credential digest could not be computed
    /// - `Err(Error)`: Transport failure
    async fn update_alias(&self, request: &UpdateRequest)
    -> Result<UpdateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
