use regex::Regex;
use std::sync::OnceLock;

use crate::error::{DiscoveryError, Result};

/// Length of a hex-encoded SHA-256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Length of a backend referral code
pub const REFERRAL_CODE_LEN: usize = 8;

#[allow(clippy::unwrap_used)]
fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Normalization and contract checks for contact identifiers
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Reduce a phone number to its digits.
    ///
    /// Parentheses, dashes, dots, spaces and a leading `+` are all dropped so
    /// that every formatting of the same number normalizes identically.
    pub fn normalize_phone(raw: &str) -> Result<String> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(DiscoveryError::InvalidInput(
                "Phone number is invalid: no digits found".to_string(),
            ));
        }

        Ok(digits)
    }

    /// Trim and lowercase an email, then check its shape.
    pub fn normalize_email(raw: &str) -> Result<String> {
        let normalized = raw.trim().to_lowercase();

        if !email_pattern().is_match(&normalized) {
            return Err(DiscoveryError::InvalidInput(
                "Email is invalid: invalid email format".to_string(),
            ));
        }

        Ok(normalized)
    }

    /// Identifiers containing `@` are treated as emails
    #[must_use]
    pub fn is_email(identifier: &str) -> bool {
        identifier.contains('@')
    }

    /// Reject an empty invite target before any network call
    pub fn validate_contact_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DiscoveryError::InvalidInput(
                "Contact identifier is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that a value looks like our hash output
    pub fn validate_hash(hash: &str) -> Result<()> {
        if hash.len() != HASH_HEX_LEN {
            return Err(DiscoveryError::InvalidInput(format!(
                "Hash must be {HASH_HEX_LEN} characters, got {}",
                hash.len()
            )));
        }

        if !hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DiscoveryError::InvalidInput(
                "Hash must be lowercase hex".to_string(),
            ));
        }

        Ok(())
    }

    /// Referral codes are exactly 8 ASCII alphanumerics
    pub fn validate_referral_code(code: &str) -> Result<()> {
        if code.len() != REFERRAL_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DiscoveryError::InvalidInput(format!(
                "Referral code must be {REFERRAL_CODE_LEN} alphanumeric characters"
            )));
        }

        Ok(())
    }

    /// The invite link must carry the code as its `ref` query parameter
    pub fn validate_invite_link(link: &str, referral_code: &str) -> Result<()> {
        let query = link
            .split_once('?')
            .map(|(_, query)| query.split('#').next().unwrap_or_default())
            .ok_or_else(|| DiscoveryError::InvalidInput("Invite link has no query".to_string()))?;

        let carries_code = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(key, value)| key == "ref" && value == referral_code);

        if !carries_code {
            return Err(DiscoveryError::InvalidInput(
                "Invite link does not carry the referral code".to_string(),
            ));
        }

        Ok(())
    }

    /// Sanitize a display name coming from a host address book
    #[must_use]
    pub fn sanitize_name(name: &str) -> Option<String> {
        let cleaned = name
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim()
            .to_string();

        (!cleaned.is_empty()).then_some(cleaned)
    }
}
