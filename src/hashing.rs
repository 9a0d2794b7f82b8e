//! One-way hashing of contact identifiers.
//!
//! Identifiers are normalized first so equivalent inputs collide, then
//! digested with unsalted SHA-256. Matching relies on two independent
//! users producing the same digest for the same real-world identifier, so
//! the output must be identical across devices and sessions.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::validation::InputValidator;

/// Normalizes and hashes phone numbers and emails
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentifierHasher: Send + Sync {
    /// Hash a phone number after stripping everything but digits
    async fn hash_phone_number(&self, raw: &str) -> Result<String>;

    /// Hash an email after trimming and lowercasing
    async fn hash_email(&self, raw: &str) -> Result<String>;

    /// Hash an identifier, treating anything containing `@` as an email
    async fn hash_contact(&self, identifier: &str) -> Result<String> {
        if InputValidator::is_email(identifier) {
            self.hash_email(identifier).await
        } else {
            self.hash_phone_number(identifier).await
        }
    }
}

/// SHA-256 hasher producing 64-character lowercase hex digests
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    /// Create a new hasher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Digest an already-normalized identifier
    #[must_use]
    pub fn digest_hex(normalized: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl IdentifierHasher for Sha256Hasher {
    async fn hash_phone_number(&self, raw: &str) -> Result<String> {
        let normalized = InputValidator::normalize_phone(raw)?;
        Ok(Self::digest_hex(&normalized))
    }

    async fn hash_email(&self, raw: &str) -> Result<String> {
        let normalized = InputValidator::normalize_email(raw)?;
        Ok(Self::digest_hex(&normalized))
    }
}
