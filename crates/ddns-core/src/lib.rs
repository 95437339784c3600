// # ddns-core
//
// Core library for the IPv6 dynamic DNS update agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **InterfaceSource**: Trait for reading a local interface's global IPv6 address
// - **PublishedResolver**: Trait for looking up the address DNS currently publishes
// - **DnsProvider**: Trait for pushing a new address to the provider
// - **AddressCache**: In-memory last-known address per host
// - **ReconcileEngine**: Timer-driven pass that ties the above together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from host and provider integrations
// 2. **One Pass at a Time**: The cache is only ever mutated by a single in-flight pass
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Never Fatal**: No per-host failure stops the loop

pub mod traits;
pub mod engine;
pub mod cache;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{
    DnsProvider, InterfaceSource, PublishedResolver, ResolvedAddress, UpdateOutcome,
    UpdateRequest,
};
pub use engine::{EngineEvent, HostOutcome, PassReport, ReconcileEngine};
pub use cache::AddressCache;
pub use config::{
    BaselinePolicy, DigestAlgorithm, EngineConfig, HostConfig, ProviderSettings, ServiceConfig,
    UpdateMode,
};
pub use error::{Error, Result};
