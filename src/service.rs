use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{DiscoveryError, Result};
use crate::hashing::{IdentifierHasher, Sha256Hasher};
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{
    ContactPermissionStatus, ContactSyncResult, HashedContact, IdentifierType, InviteMethod,
    InviteResult, MatchedContact, RawContact, UnmatchedContact,
};
use crate::platform::ContactsPlatformProvider;
use crate::repository::ContactDiscoveryRepository;

/// Phases of a single sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run in progress
    Idle,
    /// Querying the provider for access
    CheckingPermission,
    /// Terminal: permission was not granted
    Denied,
    /// Reading the address book
    Fetching,
    /// Normalizing and hashing identifiers
    Hashing,
    /// Splitting contacts into matched and unmatched
    PartitioningResults,
    /// Terminal: a result was produced
    Complete,
}

impl SyncState {
    /// Whether `next` may follow `self`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::CheckingPermission)
                | (Self::CheckingPermission, Self::Denied | Self::Fetching)
                | (Self::Fetching, Self::Hashing | Self::Complete)
                | (Self::Hashing, Self::PartitioningResults)
                | (Self::PartitioningResults, Self::Complete)
        )
    }

    /// True for `Denied` and `Complete`
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Complete)
    }
}

/// Per-call state; nothing is shared between concurrent syncs
struct SyncRun {
    state: SyncState,
}

impl SyncRun {
    const fn new() -> Self {
        Self {
            state: SyncState::Idle,
        }
    }

    fn advance(&mut self, next: SyncState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal sync transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "Sync state transition");
        self.state = next;
    }
}

/// Output of the hashing phase
struct HashedBatch {
    contacts: Vec<HashedContact>,
    hashes_generated: usize,
    errors: Vec<String>,
}

impl HashedBatch {
    /// Unique hashes in first-seen order
    fn unique_hashes(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.contacts
            .iter()
            .flat_map(|c| c.hashed_identifiers.iter())
            .filter(|hash| seen.insert(hash.as_str()))
            .cloned()
            .collect()
    }
}

/// Orchestrates permission check, fetch, hashing and partitioning
pub struct ContactsService {
    provider: Box<dyn ContactsPlatformProvider>,
    hasher: Arc<dyn IdentifierHasher>,
    repository: Arc<dyn ContactDiscoveryRepository>,
}

impl ContactsService {
    /// Service using SHA-256 hashing
    pub fn new(
        provider: Box<dyn ContactsPlatformProvider>,
        repository: Arc<dyn ContactDiscoveryRepository>,
    ) -> Self {
        Self::with_hasher(provider, Arc::new(Sha256Hasher::new()), repository)
    }

    /// Service with an explicit hasher
    pub fn with_hasher(
        provider: Box<dyn ContactsPlatformProvider>,
        hasher: Arc<dyn IdentifierHasher>,
        repository: Arc<dyn ContactDiscoveryRepository>,
    ) -> Self {
        Self {
            provider,
            hasher,
            repository,
        }
    }

    /// Prompt the user for contact access
    pub async fn request_permission(&self) -> Result<ContactPermissionStatus> {
        self.provider.request_permission().await
    }

    /// Scan the address book and split it into matched and unmatched contacts.
    ///
    /// `force_refresh` is accepted for interface stability; there is no cache
    /// to bypass. Server-side matching is not performed here, so `matched`
    /// is always empty; use [`Self::find_matches`] for that.
    pub async fn sync_contacts(&self, force_refresh: bool) -> Result<ContactSyncResult> {
        let timer = OperationTimer::new("sync_contacts");
        let mut run = SyncRun::new();
        info!(force_refresh, "Starting contact sync");

        let contacts = match self.fetch_granted(&mut run).await {
            Ok(contacts) => contacts,
            Err(e) => {
                metrics::record_sync_failure();
                timer.finish();
                return Err(e);
            }
        };

        if contacts.is_empty() {
            run.advance(SyncState::Complete);
            let result = ContactSyncResult::empty();
            metrics::record_sync(&result);
            info!("No contacts found");
            timer.finish();
            return Ok(result);
        }

        run.advance(SyncState::Hashing);
        let batch = self.hash_contacts(&contacts).await;

        run.advance(SyncState::PartitioningResults);
        let unmatched = Self::partition_unmatched(&contacts);

        let result = ContactSyncResult {
            total_contacts_scanned: contacts.len(),
            total_hashes_generated: batch.hashes_generated,
            matched: Vec::new(),
            unmatched,
            synced_at: Utc::now(),
            errors: (!batch.errors.is_empty()).then_some(batch.errors),
        };
        run.advance(SyncState::Complete);

        metrics::record_sync(&result);
        info!(
            scanned = result.total_contacts_scanned,
            hashes = result.total_hashes_generated,
            unmatched = result.unmatched.len(),
            errors = result.errors.as_ref().map_or(0, Vec::len),
            "Contact sync completed"
        );
        timer.finish();

        Ok(result)
    }

    /// Hash the address book and match it against the remote service
    pub async fn find_matches(&self) -> Result<Vec<MatchedContact>> {
        let mut run = SyncRun::new();
        let contacts = self.fetch_granted(&mut run).await?;
        if contacts.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.hash_contacts(&contacts).await;
        let hashes = batch.unique_hashes();
        debug!(
            contacts = batch.contacts.len(),
            unique_hashes = hashes.len(),
            "Submitting hashes for matching"
        );

        self.repository.match_contacts(&hashes).await
    }

    /// Invite an unmatched contact; only the identifier's hash leaves the device
    pub async fn invite_contact(
        &self,
        contact: &UnmatchedContact,
        method: InviteMethod,
    ) -> Result<InviteResult> {
        let hashed = match contact.identifier_type {
            IdentifierType::Phone => self.hasher.hash_phone_number(&contact.identifier).await?,
            IdentifierType::Email => self.hasher.hash_email(&contact.identifier).await?,
        };

        self.repository
            .send_invite(&hashed, method, contact.name.as_deref())
            .await
    }

    /// No cache exists yet; always succeeds
    pub async fn clear_cache(&self) -> Result<()> {
        debug!("clear_cache called; no cache to clear");
        Ok(())
    }

    /// Permission gate followed by the fetch phase
    async fn fetch_granted(&self, run: &mut SyncRun) -> Result<Vec<RawContact>> {
        run.advance(SyncState::CheckingPermission);
        let status = self
            .provider
            .get_permission_status()
            .await
            .map_err(|e| match e {
                DiscoveryError::PermissionDenied(_) => e,
                other => DiscoveryError::ContactSyncFailed(other.to_string()),
            })?;
        if status != ContactPermissionStatus::Granted {
            run.advance(SyncState::Denied);
            warn!(?status, "Contact permission not granted");
            return Err(DiscoveryError::PermissionDenied(
                "Contact permission not granted".to_string(),
            ));
        }

        run.advance(SyncState::Fetching);
        let contacts = self
            .provider
            .get_all_contacts()
            .await
            .map_err(|e| DiscoveryError::ContactSyncFailed(e.to_string()))?;
        debug!(count = contacts.len(), "Fetched contacts");

        Ok(contacts)
    }

    /// Hash every identifier; failures are recorded and skipped
    async fn hash_contacts(&self, contacts: &[RawContact]) -> HashedBatch {
        let mut batch = HashedBatch {
            contacts: Vec::new(),
            hashes_generated: 0,
            errors: Vec::new(),
        };

        for contact in contacts.iter().filter(|c| c.has_identifiers()) {
            let mut hashed_identifiers = Vec::new();

            for phone in &contact.phone_numbers {
                match self.hasher.hash_phone_number(phone).await {
                    Ok(hash) => hashed_identifiers.push(hash),
                    Err(e) => batch.record_error(&contact.id, IdentifierType::Phone, &e),
                }
            }

            for email in &contact.emails {
                match self.hasher.hash_email(email).await {
                    Ok(hash) => hashed_identifiers.push(hash),
                    Err(e) => batch.record_error(&contact.id, IdentifierType::Email, &e),
                }
            }

            batch.hashes_generated += hashed_identifiers.len();
            batch.contacts.push(HashedContact {
                original_id: contact.id.clone(),
                name: contact.name.clone(),
                hashed_identifiers,
                hashed_at: Utc::now(),
            });
        }

        batch
    }

    fn partition_unmatched(contacts: &[RawContact]) -> Vec<UnmatchedContact> {
        contacts
            .iter()
            .filter_map(|contact| {
                contact
                    .preferred_identifier()
                    .map(|(identifier, identifier_type)| UnmatchedContact {
                        contact_id: contact.id.clone(),
                        name: contact.name.clone(),
                        identifier: identifier.to_string(),
                        identifier_type,
                    })
            })
            .collect()
    }
}

impl HashedBatch {
    fn record_error(&mut self, contact_id: &str, kind: IdentifierType, error: &DiscoveryError) {
        if error.is_identifier_level() {
            warn!(contact_id, kind = kind.as_str(), error = %error, "Failed to hash identifier");
        } else {
            error!(contact_id, kind = kind.as_str(), error = %error, "Unexpected hashing failure");
        }
        metrics::record_hash_error(kind);
        self.errors
            .push(format!("Failed to hash {kind} for contact {contact_id}: {error}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::MockIdentifierHasher;
    use crate::platform::MockContactsPlatformProvider;
    use async_trait::async_trait;

    /// Panics if the sync pipeline reaches the network
    struct UnreachableRepository;

    #[async_trait]
    impl ContactDiscoveryRepository for UnreachableRepository {
        async fn match_contacts(&self, _hashes: &[String]) -> Result<Vec<MatchedContact>> {
            panic!("match_contacts must not be called");
        }

        async fn send_invite(
            &self,
            _contact_identifier: &str,
            _method: InviteMethod,
            _contact_name: Option<&str>,
        ) -> Result<InviteResult> {
            panic!("send_invite must not be called");
        }
    }

    fn contact(id: &str, phones: &[&str], emails: &[&str]) -> RawContact {
        RawContact {
            id: id.to_string(),
            name: Some(format!("Contact {id}")),
            phone_numbers: phones.iter().map(ToString::to_string).collect(),
            emails: emails.iter().map(ToString::to_string).collect(),
        }
    }

    fn granted_provider(contacts: Vec<RawContact>) -> MockContactsPlatformProvider {
        let mut provider = MockContactsPlatformProvider::new();
        provider
            .expect_get_permission_status()
            .returning(|| Ok(ContactPermissionStatus::Granted));
        provider
            .expect_get_all_contacts()
            .returning(move || Ok(contacts.clone()));
        provider
    }

    #[test]
    fn test_state_transitions() {
        assert!(SyncState::Idle.can_transition_to(SyncState::CheckingPermission));
        assert!(SyncState::Fetching.can_transition_to(SyncState::Complete));
        assert!(!SyncState::Idle.can_transition_to(SyncState::Hashing));
        assert!(!SyncState::Denied.can_transition_to(SyncState::Fetching));
        assert!(SyncState::Denied.is_terminal());
    }

    #[tokio::test]
    async fn test_denied_permission_never_fetches() {
        let mut provider = MockContactsPlatformProvider::new();
        provider
            .expect_get_permission_status()
            .returning(|| Ok(ContactPermissionStatus::Undetermined));
        provider.expect_get_all_contacts().never();

        let service = ContactsService::new(Box::new(provider), Arc::new(UnreachableRepository));
        let err = service.sync_contacts(false).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::PermissionDenied(_)));
        assert_eq!(err.to_string(), "Contact permission not granted");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_wrapped() {
        let mut provider = MockContactsPlatformProvider::new();
        provider
            .expect_get_permission_status()
            .returning(|| Ok(ContactPermissionStatus::Granted));
        provider
            .expect_get_all_contacts()
            .returning(|| Err(DiscoveryError::Platform("store offline".to_string())));

        let service = ContactsService::new(Box::new(provider), Arc::new(UnreachableRepository));
        let err = service.sync_contacts(false).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::ContactSyncFailed(_)));
        assert!(err.to_string().contains("store offline"));
    }

    #[tokio::test]
    async fn test_permission_query_failure_is_wrapped() {
        let mut provider = MockContactsPlatformProvider::new();
        provider
            .expect_get_permission_status()
            .returning(|| Err(DiscoveryError::Platform("binding crashed".to_string())));
        provider.expect_get_all_contacts().never();

        let service = ContactsService::new(Box::new(provider), Arc::new(UnreachableRepository));
        let err = service.sync_contacts(false).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::ContactSyncFailed(_)));
        assert!(err.to_string().contains("binding crashed"));
    }

    #[tokio::test]
    async fn test_empty_address_book_skips_hashing() {
        let mut hasher = MockIdentifierHasher::new();
        hasher.expect_hash_phone_number().never();
        hasher.expect_hash_email().never();

        let service = ContactsService::with_hasher(
            Box::new(granted_provider(Vec::new())),
            Arc::new(hasher),
            Arc::new(UnreachableRepository),
        );
        let result = service.sync_contacts(true).await.unwrap();

        assert_eq!(result.total_contacts_scanned, 0);
        assert_eq!(result.total_hashes_generated, 0);
        assert!(result.unmatched.is_empty());
        assert!(result.errors.is_none());
    }

    #[tokio::test]
    async fn test_every_identifier_is_hashed() {
        let mut hasher = MockIdentifierHasher::new();
        hasher
            .expect_hash_phone_number()
            .times(2)
            .returning(|raw| Ok(format!("phone:{raw}")));
        hasher
            .expect_hash_email()
            .times(1)
            .returning(|raw| Ok(format!("email:{raw}")));

        let service = ContactsService::with_hasher(
            Box::new(granted_provider(vec![contact(
                "c1",
                &["111", "222"],
                &["a@example.com"],
            )])),
            Arc::new(hasher),
            Arc::new(UnreachableRepository),
        );
        let result = service.sync_contacts(false).await.unwrap();

        assert_eq!(result.total_hashes_generated, 3);
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.unmatched[0].identifier, "111");
    }

    #[tokio::test]
    async fn test_hash_failure_is_not_fatal() {
        let mut hasher = MockIdentifierHasher::new();
        hasher.expect_hash_phone_number().returning(|_| {
            Err(DiscoveryError::HashingFailed("digest unavailable".into()))
        });
        hasher
            .expect_hash_email()
            .returning(|_| Ok("e".repeat(64)));

        let service = ContactsService::with_hasher(
            Box::new(granted_provider(vec![
                contact("c1", &["555-0100"], &[]),
                contact("c2", &[], &["b@example.com"]),
            ])),
            Arc::new(hasher),
            Arc::new(UnreachableRepository),
        );
        let result = service.sync_contacts(false).await.unwrap();

        assert_eq!(result.unmatched.len(), 2);
        assert_eq!(result.total_hashes_generated, 1);
        let errors = result.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to hash phone"));
        assert!(!errors[0].contains("555-0100"));
    }

    #[tokio::test]
    async fn test_clear_cache_is_idempotent() {
        let service = ContactsService::new(
            Box::new(MockContactsPlatformProvider::new()),
            Arc::new(UnreachableRepository),
        );
        assert!(service.clear_cache().await.is_ok());
        assert!(service.clear_cache().await.is_ok());
    }

    #[test]
    fn test_record_error_keeps_unexpected_failures() {
        let mut batch = HashedBatch {
            contacts: Vec::new(),
            hashes_generated: 0,
            errors: Vec::new(),
        };

        batch.record_error(
            "c1",
            IdentifierType::Email,
            &DiscoveryError::InvalidInput("Email is invalid: invalid email format".to_string()),
        );
        batch.record_error(
            "c2",
            IdentifierType::Phone,
            &DiscoveryError::Platform("runtime gone".to_string()),
        );

        assert_eq!(batch.errors.len(), 2);
        assert_eq!(
            batch.errors[0],
            "Failed to hash email for contact c1: Email is invalid: invalid email format"
        );
        assert!(batch.errors[1].starts_with("Failed to hash phone for contact c2"));
    }

    #[test]
    fn test_unique_hashes_preserve_order() {
        let batch = HashedBatch {
            contacts: vec![
                HashedContact {
                    original_id: "1".into(),
                    name: None,
                    hashed_identifiers: vec!["b".into(), "a".into()],
                    hashed_at: Utc::now(),
                },
                HashedContact {
                    original_id: "2".into(),
                    name: None,
                    hashed_identifiers: vec!["a".into(), "c".into()],
                    hashed_at: Utc::now(),
                },
            ],
            hashes_generated: 4,
            errors: Vec::new(),
        };
        assert_eq!(batch.unique_hashes(), vec!["b", "a", "c"]);
    }
}
