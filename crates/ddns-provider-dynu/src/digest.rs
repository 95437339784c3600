// Credential digests sent in place of the plaintext password.

use ddns_core::{DigestAlgorithm, Error, Result};
use sha2::Digest as _;

/// One-way transform of the account password
///
/// Computed fresh for every update call. Implementations return
/// `Error::Digest` on failure; the engine fails that one update and moves on.
pub trait PasswordDigest: Send + Sync {
    /// Lowercase hex digest of `password`
    fn digest(&self, password: &str) -> Result<String>;

    /// Algorithm this digest implements
    fn algorithm(&self) -> DigestAlgorithm;
}

/// MD5, as the Dynu update API expects
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Digest;

impl PasswordDigest for Md5Digest {
    fn digest(&self, password: &str) -> Result<String> {
        Ok(hex::encode(md5::Md5::digest(password.as_bytes())))
    }

    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Md5
    }
}

/// SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl PasswordDigest for Sha256Digest {
    fn digest(&self, password: &str) -> Result<String> {
        Ok(hex::encode(sha2::Sha256::digest(password.as_bytes())))
    }

    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sha256
    }
}

/// Digest implementation for a configured algorithm
pub fn for_algorithm(algorithm: DigestAlgorithm) -> Box<dyn PasswordDigest> {
    match algorithm {
        DigestAlgorithm::Md5 => Box::new(Md5Digest),
        DigestAlgorithm::Sha256 => Box::new(Sha256Digest),
    }
}

/// Digest that always fails, for exercising the error path
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDigest;

impl PasswordDigest for UnavailableDigest {
    fn digest(&self, _password: &str) -> Result<String> {
        Err(Error::digest("digest algorithm unavailable"))
    }

    fn algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Md5
    }
}
