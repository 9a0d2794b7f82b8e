//! Metrics emitted by the discovery pipeline.
//!
//! Only the `metrics` facade is used here; the embedding application decides
//! whether a recorder is installed.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::models::{ContactSyncResult, IdentifierType};

pub const SYNC_TOTAL: &str = "contact_discovery_sync_total";
pub const CONTACTS_SCANNED: &str = "contact_discovery_contacts_scanned";
pub const HASHES_GENERATED_TOTAL: &str = "contact_discovery_hashes_generated_total";
pub const HASH_ERRORS_TOTAL: &str = "contact_discovery_hash_errors_total";
pub const REMOTE_CALLS_TOTAL: &str = "contact_discovery_remote_calls_total";
pub const REMOTE_CALL_DURATION: &str = "contact_discovery_remote_call_duration_seconds";

/// Record the outcome of a completed sync
pub fn record_sync(result: &ContactSyncResult) {
    let status = if result.has_errors() { "partial" } else { "success" };
    counter!(SYNC_TOTAL, "status" => status).increment(1);
    histogram!(CONTACTS_SCANNED).record(result.total_contacts_scanned as f64);
    counter!(HASHES_GENERATED_TOTAL).increment(result.total_hashes_generated as u64);
}

/// Record a sync aborted before any result was produced
pub fn record_sync_failure() {
    counter!(SYNC_TOTAL, "status" => "failed").increment(1);
}

/// Record one identifier that could not be hashed
pub fn record_hash_error(kind: IdentifierType) {
    counter!(HASH_ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record a callable-function invocation
pub fn record_remote_call(function: &str, duration: Duration, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        REMOTE_CALLS_TOTAL,
        "function" => function.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(REMOTE_CALL_DURATION, "function" => function.to_string())
        .record(duration.as_secs_f64());
}
