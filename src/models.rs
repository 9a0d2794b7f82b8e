//! Data models for contact discovery
//!
//! This module contains the address-book records handled during a sync,
//! the aggregate result handed to the UI layer, and the request/response
//! payloads exchanged with the remote matching and invite functions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contact as acquired from the device address book.
///
/// Created per sync call and discarded once hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContact {
    /// Opaque device identifier
    pub id: String,
    /// Display name, if the address book has one
    pub name: Option<String>,
    /// Phone numbers exactly as stored on the device
    pub phone_numbers: Vec<String>,
    /// Email addresses exactly as stored on the device
    pub emails: Vec<String>,
}

impl RawContact {
    /// True if the contact has at least one phone number or email
    #[must_use]
    pub fn has_identifiers(&self) -> bool {
        !self.phone_numbers.is_empty() || !self.emails.is_empty()
    }

    /// Pick the identifier used for invites: first phone, else first email.
    #[must_use]
    pub fn preferred_identifier(&self) -> Option<(&str, IdentifierType)> {
        self.phone_numbers
            .first()
            .map(|phone| (phone.as_str(), IdentifierType::Phone))
            .or_else(|| {
                self.emails
                    .first()
                    .map(|email| (email.as_str(), IdentifierType::Email))
            })
    }
}

/// One device contact after its identifiers were hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedContact {
    /// Back-reference to `RawContact::id`
    pub original_id: String,
    /// Client-side only, never transmitted
    pub name: Option<String>,
    /// One SHA-256 hex digest per successfully hashed identifier
    pub hashed_identifiers: Vec<String>,
    /// When hashing finished
    pub hashed_at: DateTime<Utc>,
}

/// A device contact that matched an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedContact {
    /// Platform user id
    pub user_id: String,
    /// Name shown on the user's profile
    pub display_name: String,
    /// Public username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Profile photo location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    /// Number of friends in common with the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutual_friends: Option<u32>,
}

/// Kind of plaintext identifier carried by an unmatched contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    /// Phone number
    Phone,
    /// Email address
    Email,
}

impl IdentifierType {
    /// Lowercase label used in logs and error messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device contact eligible for an invite.
///
/// `identifier` is plaintext and only lives in memory for the invite
/// action; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedContact {
    /// Back-reference to `RawContact::id`
    pub contact_id: String,
    /// Device display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Preferred plaintext identifier
    pub identifier: String,
    /// Whether `identifier` is a phone number or an email
    pub identifier_type: IdentifierType,
}

/// Aggregate outcome of one `sync_contacts` run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSyncResult {
    /// Every contact returned by the provider, with or without identifiers
    pub total_contacts_scanned: usize,
    /// Successful hash computations
    pub total_hashes_generated: usize,
    /// Contacts that are already users
    pub matched: Vec<MatchedContact>,
    /// Invite candidates
    pub unmatched: Vec<UnmatchedContact>,
    /// When the sync completed
    pub synced_at: DateTime<Utc>,
    /// Present only when at least one identifier failed to hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ContactSyncResult {
    /// Result for an address book with no contacts
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_contacts_scanned: 0,
            total_hashes_generated: 0,
            matched: Vec::new(),
            unmatched: Vec::new(),
            synced_at: Utc::now(),
            errors: None,
        }
    }

    /// True when some contacts could not be processed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

/// Contact access permission as seen by the sync pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPermissionStatus {
    /// Contacts may be read
    Granted,
    /// The user refused access
    Denied,
    /// The user has not been asked yet, or the state is unknown
    Undetermined,
}

/// Channel used to deliver an invite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteMethod {
    /// Text message
    Sms,
    /// Email
    Email,
    /// Copied link
    Link,
    /// System share sheet
    Share,
}

impl InviteMethod {
    /// Wire value of the method
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Link => "link",
            Self::Share => "share",
        }
    }
}

/// Shareable invite returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResult {
    /// 8-character referral code
    pub referral_code: String,
    /// Link carrying the referral code as `ref` query parameter
    pub invite_link: String,
}

/// Payload of the remote matching function
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchContactsRequest<'a> {
    /// 64-char lowercase hex SHA-256 digests
    pub hashed_identifiers: &'a [String],
}

/// Response of the remote matching function
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchContactsResponse {
    /// Whether the server processed the batch
    pub success: bool,
    /// Users matching the submitted hashes
    #[serde(default)]
    pub matches: Vec<MatchedContact>,
    /// Hashes the server received
    #[serde(default)]
    pub total_hashes: usize,
    /// Number of entries in `matches`
    #[serde(default)]
    pub total_matches: usize,
    /// Server-provided failure message
    #[serde(default)]
    pub error: Option<String>,
}

/// Payload of the remote invite function
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInviteRequest<'a> {
    /// Identifier the invite is deduplicated on
    pub contact_identifier: &'a str,
    /// Delivery channel
    pub invite_method: InviteMethod,
    /// Optional name to personalize the invite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<&'a str>,
}

/// Response of the remote invite function
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInviteResponse {
    /// Whether the invite was issued (or an existing one reused)
    pub success: bool,
    /// 8-character referral code
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Shareable link
    #[serde(default)]
    pub invite_link: Option<String>,
    /// Server-provided failure message
    #[serde(default)]
    pub error: Option<String>,
}
