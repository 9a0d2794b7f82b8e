use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::metrics;
use crate::models::{
    InviteMethod, InviteResult, MatchContactsRequest, MatchContactsResponse, MatchedContact,
    SendInviteRequest, SendInviteResponse,
};
use crate::transport::{CallableError, FunctionsTransport};
use crate::validation::InputValidator;

/// Remote matching and invite operations
#[async_trait]
pub trait ContactDiscoveryRepository: Send + Sync {
    /// Match hashed identifiers against existing users.
    ///
    /// An empty batch returns immediately without contacting the server.
    async fn match_contacts(&self, hashes: &[String]) -> Result<Vec<MatchedContact>>;

    /// Issue (or reuse) an invite for a contact.
    ///
    /// Repeat invites to the same identifier inside the server's dedup
    /// window come back with the same referral code and are not errors.
    async fn send_invite(
        &self,
        contact_identifier: &str,
        method: InviteMethod,
        contact_name: Option<&str>,
    ) -> Result<InviteResult>;
}

/// Code to message translations, scoped to one call site
type ErrorTable = &'static [(&'static str, &'static str)];

const MATCH_ERROR_MESSAGES: ErrorTable = &[
    ("unauthenticated", "You must be signed in to match contacts"),
    ("resource-exhausted", "Rate limit exceeded. Please try again later."),
];

const INVITE_ERROR_MESSAGES: ErrorTable = &[
    ("unauthenticated", "You must be signed in to send invites"),
    (
        "resource-exhausted",
        "Daily invite limit reached (100/day). Try again tomorrow.",
    ),
];

/// Codes without a table entry surface the server's message unmodified
fn translate(table: ErrorTable, error: &CallableError) -> DiscoveryError {
    let code = error.code.as_str();
    let message = table
        .iter()
        .find(|(known, _)| *known == code)
        .map_or_else(|| error.message.clone(), |(_, message)| (*message).to_string());

    DiscoveryError::remote(Some(code), message)
}

/// Repository backed by callable backend functions
pub struct RemoteDiscoveryRepository {
    transport: Arc<dyn FunctionsTransport>,
    match_function: String,
    invite_function: String,
}

impl RemoteDiscoveryRepository {
    /// Create a repository calling the functions named in `config`
    pub fn new(transport: Arc<dyn FunctionsTransport>, config: &DiscoveryConfig) -> Self {
        Self {
            transport,
            match_function: config.match_function.clone(),
            invite_function: config.invite_function.clone(),
        }
    }

    async fn invoke(&self, function: &str, payload: Value, errors: ErrorTable) -> Result<Value> {
        let start = Instant::now();
        let outcome = self.transport.call(function, payload).await;
        metrics::record_remote_call(function, start.elapsed(), outcome.is_ok());

        outcome.map_err(|e| {
            warn!(function, code = %e.code, "Callable function failed");
            translate(errors, &e)
        })
    }
}

#[async_trait]
impl ContactDiscoveryRepository for RemoteDiscoveryRepository {
    async fn match_contacts(&self, hashes: &[String]) -> Result<Vec<MatchedContact>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let payload = serde_json::to_value(MatchContactsRequest {
            hashed_identifiers: hashes,
        })?;
        let value = self
            .invoke(&self.match_function, payload, MATCH_ERROR_MESSAGES)
            .await?;
        let response: MatchContactsResponse = serde_json::from_value(value)?;

        if !response.success {
            return Err(DiscoveryError::remote(
                None,
                response
                    .error
                    .unwrap_or_else(|| "Failed to match contacts".to_string()),
            ));
        }

        info!(
            submitted = hashes.len(),
            server_hashes = response.total_hashes,
            matched = response.total_matches,
            "Contact matching completed"
        );
        Ok(response.matches)
    }

    async fn send_invite(
        &self,
        contact_identifier: &str,
        method: InviteMethod,
        contact_name: Option<&str>,
    ) -> Result<InviteResult> {
        InputValidator::validate_contact_identifier(contact_identifier)?;

        let payload = serde_json::to_value(SendInviteRequest {
            contact_identifier,
            invite_method: method,
            contact_name,
        })?;
        let value = self
            .invoke(&self.invite_function, payload, INVITE_ERROR_MESSAGES)
            .await?;
        let response: SendInviteResponse = serde_json::from_value(value)?;

        if !response.success {
            return Err(DiscoveryError::remote(
                None,
                response
                    .error
                    .unwrap_or_else(|| "Failed to send invite".to_string()),
            ));
        }

        let (Some(referral_code), Some(invite_link)) = (response.referral_code, response.invite_link)
        else {
            return Err(DiscoveryError::remote(None, "Received an invalid invite response"));
        };

        if let Err(e) = InputValidator::validate_referral_code(&referral_code)
            .and_then(|()| InputValidator::validate_invite_link(&invite_link, &referral_code))
        {
            warn!(error = %e, "Invite response violates the invite contract");
            return Err(DiscoveryError::remote(None, "Received an invalid invite response"));
        }

        debug!(method = method.as_str(), "Invite issued");
        Ok(InviteResult {
            referral_code,
            invite_link,
        })
    }
}
