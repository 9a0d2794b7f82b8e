//! Contact Discovery - privacy-preserving address-book matching
//!
//! Turns a device address book into one-way hashed identifiers, submits
//! them for server-side matching without sending plaintext contact data,
//! and splits the address book into already-registered users and invite
//! candidates.
//!
//! # Features
//!
//! - Phone/email normalization and SHA-256 hashing
//! - Interchangeable mobile and web contact providers
//! - Sync pipeline that tolerates per-identifier failures
//! - Remote matching and invite calls with per-operation error messages

/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Identifier normalization and hashing
pub mod hashing;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Host platform contact providers
pub mod platform;
/// Remote matching and invite operations
pub mod repository;
/// Sync orchestration
pub mod service;
/// Callable-function transport
pub mod transport;
/// Input validation and normalization
pub mod validation;

// Re-export key components for easier access
pub use error::{DiscoveryError, Result};
pub use hashing::{IdentifierHasher, Sha256Hasher};
pub use models::{
    ContactPermissionStatus, ContactSyncResult, IdentifierType, InviteMethod, InviteResult,
    MatchedContact, RawContact, UnmatchedContact,
};
pub use platform::{select_provider, ContactsPlatformProvider, HostPlatform};
pub use repository::{ContactDiscoveryRepository, RemoteDiscoveryRepository};
pub use service::{ContactsService, SyncState};
