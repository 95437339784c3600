// # Dynu DNS Provider
//
// This crate pushes alias address changes to Dynu's IP update endpoint.
//
// ## Behavior
//
// - One GET per update call, no retry (the next pass re-attempts)
// - The response status is logged, never treated as a failure
// - The password travels only as a digest, computed fresh per call
// - Dry-run mode builds and logs the request without sending it
//
// ## Security Requirements
//
// - Neither the password nor its digest ever appears in logs or `Debug` output
// - Construction fails fast on empty credentials
//
// ## API Reference
//
// ```http
// GET /nic/update?hostname=<domain>&alias=<alias>&myipv6=<addr>&username=<user>&password=<digest>
// ```

pub mod digest;

use async_trait::async_trait;
use ddns_core::traits::{DnsProvider, UpdateOutcome, UpdateRequest};
use ddns_core::{Error, Result, ServiceConfig, UpdateMode};
use reqwest::Url;
use std::time::Duration;

pub use digest::{Md5Digest, PasswordDigest, Sha256Digest};

/// Default HTTP timeout for update requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const REDACTED: &str = "<REDACTED>";

/// Dynu update-endpoint provider
///
/// # Dry-Run Mode
///
/// With [`UpdateMode::DryRun`] the full request URL is built (digest
/// included) and logged in redacted form; nothing leaves the host.
pub struct DynuProvider {
    endpoint: Url,

    username: String,

    /// ⚠️ NEVER log this value
    password: String,

    digest: Box<dyn PasswordDigest>,

    client: reqwest::Client,

    mode: UpdateMode,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for DynuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynuProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("digest", &self.digest.algorithm())
            .field("mode", &self.mode)
            .finish()
    }
}

impl DynuProvider {
    /// Create a new Dynu provider using the MD5 digest
    ///
    /// # Errors
    ///
    /// - `Error::Config` for an empty user id or password, or an unparsable endpoint
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(
        endpoint: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        mode: UpdateMode,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(Error::config("Dynu user id cannot be empty"));
        }
        if password.is_empty() {
            return Err(Error::config("Dynu password cannot be empty"));
        }

        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid update endpoint '{}': {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            username,
            password,
            digest: Box::new(Md5Digest),
            client,
            mode,
        })
    }

    /// Create a provider from the agent configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let provider = Self::new(
            &config.provider.endpoint,
            config.user_id.clone(),
            config.password.clone(),
            config.provider.mode,
        )?
        .with_digest(digest::for_algorithm(config.provider.digest));

        if provider.mode == UpdateMode::DryRun {
            tracing::warn!("Dynu provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(provider)
    }

    /// Replace the credential digest
    pub fn with_digest(mut self, digest: Box<dyn PasswordDigest>) -> Self {
        self.digest = digest;
        self
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Full update URL for `request`, credential digest included
    pub fn build_update_url(&self, request: &UpdateRequest) -> Result<Url> {
        let password = self.digest.digest(&self.password)?;
        Ok(self.url_with_password(request, &password))
    }

    /// The same URL with the credential replaced, safe to log
    pub fn redacted_url(&self, request: &UpdateRequest) -> Url {
        self.url_with_password(request, "***")
    }

    fn url_with_password(&self, request: &UpdateRequest, password: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("hostname", &request.domain)
            .append_pair("alias", &request.alias)
            .append_pair("myipv6", &request.address.to_string())
            .append_pair("username", &self.username)
            .append_pair("password", password);
        url
    }
}

#[async_trait]
impl DnsProvider for DynuProvider {
    async fn update_alias(&self, request: &UpdateRequest) -> Result<UpdateOutcome> {
        let url = self.build_update_url(request)?;

        if self.mode == UpdateMode::DryRun {
            tracing::info!(
                "[DRY-RUN] Would send GET {} ({})",
                self.redacted_url(request),
                request
            );
            return Ok(UpdateOutcome::DryRun);
        }

        tracing::info!("Updating Dynu alias: {}", request);
        tracing::debug!("GET {}", self.redacted_url(request));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Dynu update for {} answered {}", request, status);
        } else {
            tracing::warn!("Dynu update for {} answered {}", request, status);
        }

        Ok(UpdateOutcome::Sent {
            status: status.as_u16(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "dynu"
    }
}
