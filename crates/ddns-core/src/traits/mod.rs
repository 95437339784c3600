//! Core traits for the DDNS agent
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`InterfaceSource`]: Read the live IPv6 address of a local interface
//! - [`PublishedResolver`]: Look up what DNS currently publishes for a host
//! - [`DnsProvider`]: Push a new address to the provider

pub mod interface_source;
pub mod published_resolver;
pub mod dns_provider;

pub use interface_source::{InterfaceSource, first_global_candidate, is_global_candidate};
pub use published_resolver::{PublishedResolver, ResolvedAddress, select_baseline};
pub use dns_provider::{DnsProvider, UpdateOutcome, UpdateRequest};
