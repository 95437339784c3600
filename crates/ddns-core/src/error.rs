//! Error types for the DDNS agent
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS agent
#[derive(Error, Debug)]
pub enum Error {
    /// The named network interface does not exist on this host
    #[error("Interface not found: {0}")]
    InterfaceNotFound(String),

    /// The interface exists but carries no global IPv6 address
    #[error("No global IPv6 address on interface: {0}")]
    NoGlobalAddress(String),

    /// Enumerating interface addresses failed at the OS level
    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    /// Name resolution of a published host failed
    #[error("Name resolution failed: {0}")]
    Resolution(String),

    /// Computing the credential digest failed
    #[error("Credential digest failed: {0}")]
    Digest(String),

    /// HTTP client errors (from the provider endpoint)
    #[error("HTTP error: {0}")]
    Http(String),

    /// A lookup or update call did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// I/O errors (reading configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an interface-not-found error
    pub fn interface_not_found(name: impl Into<String>) -> Self {
        Self::InterfaceNotFound(name.into())
    }

    /// Create a no-global-address error
    pub fn no_global_address(name: impl Into<String>) -> Self {
        Self::NoGlobalAddress(name.into())
    }

    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a name resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a credential digest error
    pub fn digest(msg: impl Into<String>) -> Self {
        Self::Digest(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "no live address this pass" rather than a fault
    pub fn is_address_absent(&self) -> bool {
        matches!(self, Self::InterfaceNotFound(_) | Self::NoGlobalAddress(_))
    }
}
