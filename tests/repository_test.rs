//! Tests for the remote repository against a simulated backend

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use contact_discovery::config::DiscoveryConfig;
use contact_discovery::transport::{CallResult, CallableError, CallableErrorCode, FunctionsTransport};
use contact_discovery::{
    ContactDiscoveryRepository, InviteMethod, RemoteDiscoveryRepository, Sha256Hasher,
};

const DAILY_INVITE_LIMIT: usize = 100;
const MAX_HASHES: usize = 1000;

/// Simulated backend following the matching/invite contract
struct FakeBackend {
    caller_hash: String,
    users: HashMap<String, (&'static str, &'static str)>,
    referral_codes: Mutex<HashMap<String, String>>,
    invites_today: AtomicUsize,
    calls: AtomicUsize,
    signed_in: bool,
}

impl FakeBackend {
    fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(Sha256Hasher::digest_hex("15550100001"), ("u-ada", "Ada"));
        users.insert(own_hash(), ("u-me", "Me"));
        Self {
            caller_hash: own_hash(),
            users,
            referral_codes: Mutex::new(HashMap::new()),
            invites_today: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            signed_in: true,
        }
    }

    fn match_contacts(&self, payload: &Value) -> CallResult {
        let hashes: Vec<String> = serde_json::from_value(payload["hashedIdentifiers"].clone())
            .map_err(|e| CallableError::new(CallableErrorCode::InvalidArgument, e.to_string()))?;
        if hashes.len() > MAX_HASHES {
            return Err(CallableError::new(
                CallableErrorCode::InvalidArgument,
                "Maximum 1000 hashes per request",
            ));
        }

        let matches: Vec<Value> = hashes
            .iter()
            .filter(|h| **h != self.caller_hash)
            .filter_map(|h| self.users.get(h))
            .map(|(id, name)| json!({"userId": id, "displayName": name}))
            .collect();

        Ok(json!({
            "success": true,
            "totalHashes": hashes.len(),
            "totalMatches": matches.len(),
            "matches": matches,
        }))
    }

    fn send_invite(&self, payload: &Value) -> CallResult {
        let identifier = payload["contactIdentifier"].as_str().unwrap_or_default().to_string();
        let mut codes = self.referral_codes.lock().unwrap();

        if let Some(code) = codes.get(&identifier) {
            return Ok(invite_body(code));
        }
        if self.invites_today.fetch_add(1, Ordering::SeqCst) >= DAILY_INVITE_LIMIT {
            return Err(CallableError::new(
                CallableErrorCode::ResourceExhausted,
                "Daily invite limit exceeded",
            ));
        }

        let code = format!("R{:07}", codes.len());
        codes.insert(identifier, code.clone());
        Ok(invite_body(&code))
    }
}

fn own_hash() -> String {
    Sha256Hasher::digest_hex("15550109999")
}

fn invite_body(code: &str) -> Value {
    json!({
        "success": true,
        "referralCode": code,
        "inviteLink": format!("https://app.example.com/invite?ref={code}"),
    })
}

#[async_trait]
impl FunctionsTransport for FakeBackend {
    async fn call(&self, name: &str, payload: Value) -> CallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.signed_in {
            return Err(CallableError::new(
                CallableErrorCode::Unauthenticated,
                "The function must be called while authenticated.",
            ));
        }
        match name {
            "matchContacts" => self.match_contacts(&payload),
            "sendInvite" => self.send_invite(&payload),
            other => Err(CallableError::new(CallableErrorCode::NotFound, format!("{other} not found"))),
        }
    }
}

fn repository(backend: Arc<FakeBackend>) -> RemoteDiscoveryRepository {
    RemoteDiscoveryRepository::new(backend, &DiscoveryConfig::default())
}

#[tokio::test]
async fn test_empty_batch_skips_network() {
    let backend = Arc::new(FakeBackend::new());
    let matches = repository(backend.clone()).match_contacts(&[]).await.unwrap();

    assert!(matches.is_empty());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_match_returns_known_users() {
    let backend = Arc::new(FakeBackend::new());
    let hashes = vec![
        Sha256Hasher::digest_hex("15550100001"),
        Sha256Hasher::digest_hex("15550100002"),
    ];

    let matches = repository(backend).match_contacts(&hashes).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].user_id, "u-ada");
    assert_eq!(matches[0].display_name, "Ada");
}

#[tokio::test]
async fn test_own_hash_is_passed_through_and_excluded_by_server() {
    let backend = Arc::new(FakeBackend::new());
    let hashes = vec![own_hash(), Sha256Hasher::digest_hex("15550100001")];

    let matches = repository(backend).match_contacts(&hashes).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches.iter().all(|m| m.user_id != "u-me"));
}

#[tokio::test]
async fn test_oversized_batch_surfaces_server_error() {
    let backend = Arc::new(FakeBackend::new());
    let hashes: Vec<String> = (0..=MAX_HASHES)
        .map(|i| Sha256Hasher::digest_hex(&i.to_string()))
        .collect();

    let err = repository(backend.clone()).match_contacts(&hashes).await.unwrap_err();

    assert_eq!(err.to_string(), "Maximum 1000 hashes per request");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unauthenticated_messages_per_operation() {
    let mut backend = FakeBackend::new();
    backend.signed_in = false;
    let repo = repository(Arc::new(backend));

    let match_err = repo
        .match_contacts(&[Sha256Hasher::digest_hex("1")])
        .await
        .unwrap_err();
    let invite_err = repo
        .send_invite("abc", InviteMethod::Email, None)
        .await
        .unwrap_err();

    assert_eq!(match_err.to_string(), "You must be signed in to match contacts");
    assert_eq!(invite_err.to_string(), "You must be signed in to send invites");
}

#[tokio::test]
async fn test_repeat_invite_returns_same_code() {
    let backend = Arc::new(FakeBackend::new());
    let repo = repository(backend);
    let target = Sha256Hasher::digest_hex("15550100002");

    let first = repo.send_invite(&target, InviteMethod::Sms, Some("Bob")).await.unwrap();
    let second = repo.send_invite(&target, InviteMethod::Share, None).await.unwrap();

    assert_eq!(first.referral_code.len(), 8);
    assert_eq!(first.referral_code, second.referral_code);
    assert!(first
        .invite_link
        .ends_with(&format!("?ref={}", first.referral_code)));
}

#[tokio::test]
async fn test_daily_invite_limit() {
    let backend = Arc::new(FakeBackend::new());
    let repo = repository(backend);

    for i in 0..DAILY_INVITE_LIMIT {
        repo.send_invite(&format!("contact-{i}"), InviteMethod::Link, None)
            .await
            .unwrap();
    }

    let err = repo
        .send_invite("one-too-many", InviteMethod::Link, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Daily invite limit reached (100/day). Try again tomorrow."
    );

    // already-invited contacts still resolve to their code
    assert!(repo.send_invite("contact-0", InviteMethod::Link, None).await.is_ok());
}

#[tokio::test]
async fn test_server_failure_message_is_verbatim() {
    struct Refusing;

    #[async_trait]
    impl FunctionsTransport for Refusing {
        async fn call(&self, _name: &str, _payload: Value) -> CallResult {
            Ok(json!({"success": false, "error": "Matching is paused for maintenance"}))
        }
    }

    let repo = RemoteDiscoveryRepository::new(Arc::new(Refusing), &DiscoveryConfig::default());
    let err = repo
        .match_contacts(&[Sha256Hasher::digest_hex("1")])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Matching is paused for maintenance");
}
