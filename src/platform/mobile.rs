use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ContactsPlatformProvider;
use crate::error::{DiscoveryError, Result};
use crate::models::{ContactPermissionStatus, RawContact};
use crate::validation::InputValidator;

/// Phone entry as stored by the OS
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePhoneNumber {
    /// The number, when the record has one
    #[serde(default)]
    pub number: Option<String>,
    /// Label such as "mobile" or "home"
    #[serde(default)]
    pub label: Option<String>,
}

/// Email entry as stored by the OS
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEmail {
    /// The address, when the record has one
    #[serde(default)]
    pub email: Option<String>,
    /// Label such as "work"
    #[serde(default)]
    pub label: Option<String>,
}

/// Contact record as returned by the OS contact store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeContact {
    /// OS record identifier
    pub id: String,
    /// Full display name
    #[serde(default)]
    pub name: Option<String>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Phone entries
    #[serde(default)]
    pub phone_numbers: Vec<NativePhoneNumber>,
    /// Email entries
    #[serde(default)]
    pub emails: Vec<NativeEmail>,
}

impl NativeContact {
    fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().and_then(InputValidator::sanitize_name) {
            return Some(name);
        }

        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        InputValidator::sanitize_name(&joined)
    }

    fn into_raw(self) -> RawContact {
        let name = self.display_name();
        let phone_numbers = self
            .phone_numbers
            .into_iter()
            .filter_map(|p| p.number)
            .filter(|n| !n.trim().is_empty())
            .collect();
        let emails = self
            .emails
            .into_iter()
            .filter_map(|e| e.email)
            .filter(|e| !e.trim().is_empty())
            .collect();

        RawContact {
            id: self.id,
            name,
            phone_numbers,
            emails,
        }
    }
}

/// Binding to the OS contact store.
///
/// Permission states are reported as the OS's own strings.
#[async_trait]
pub trait NativeContactStore: Send + Sync {
    /// Prompt for access; returns the resulting OS state
    async fn request_permission(&self) -> anyhow::Result<String>;

    /// Current OS state
    async fn permission_status(&self) -> anyhow::Result<String>;

    /// All records, unfiltered
    async fn fetch_contacts(&self) -> anyhow::Result<Vec<NativeContact>>;

    /// Whether the contact store exists on this device
    fn is_available(&self) -> bool {
        true
    }
}

/// Map an OS permission string onto the three-valued status
#[must_use]
pub fn map_native_status(status: &str) -> ContactPermissionStatus {
    match status.trim().to_ascii_lowercase().as_str() {
        "granted" | "authorized" => ContactPermissionStatus::Granted,
        "denied" => ContactPermissionStatus::Denied,
        other => {
            tracing::debug!(status = other, "Unrecognized native permission state");
            ContactPermissionStatus::Undetermined
        }
    }
}

/// Provider backed by the device's native contact store
pub struct MobileContactsProvider {
    store: Box<dyn NativeContactStore>,
}

impl MobileContactsProvider {
    /// Wrap a native store binding
    #[must_use]
    pub fn new(store: Box<dyn NativeContactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContactsPlatformProvider for MobileContactsProvider {
    async fn request_permission(&self) -> Result<ContactPermissionStatus> {
        let status = self.store.request_permission().await?;
        Ok(map_native_status(&status))
    }

    async fn get_permission_status(&self) -> Result<ContactPermissionStatus> {
        let status = self.store.permission_status().await?;
        Ok(map_native_status(&status))
    }

    async fn get_all_contacts(&self) -> Result<Vec<RawContact>> {
        if self.get_permission_status().await? != ContactPermissionStatus::Granted {
            return Err(DiscoveryError::PermissionDenied(
                "Contacts permission not granted".to_string(),
            ));
        }

        let contacts = self.store.fetch_contacts().await?;
        tracing::debug!(count = contacts.len(), "Fetched native contacts");

        Ok(contacts.into_iter().map(NativeContact::into_raw).collect())
    }

    fn is_supported(&self) -> bool {
        self.store.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStore {
        status: &'static str,
        contacts: Vec<NativeContact>,
    }

    #[async_trait]
    impl NativeContactStore for FixedStore {
        async fn request_permission(&self) -> anyhow::Result<String> {
            Ok(self.status.to_string())
        }

        async fn permission_status(&self) -> anyhow::Result<String> {
            Ok(self.status.to_string())
        }

        async fn fetch_contacts(&self) -> anyhow::Result<Vec<NativeContact>> {
            Ok(self.contacts.clone())
        }
    }

    #[test]
    fn test_map_native_status() {
        assert_eq!(map_native_status("granted"), ContactPermissionStatus::Granted);
        assert_eq!(map_native_status("DENIED"), ContactPermissionStatus::Denied);
        assert_eq!(map_native_status("limited"), ContactPermissionStatus::Undetermined);
        assert_eq!(map_native_status("restricted"), ContactPermissionStatus::Undetermined);
    }

    #[tokio::test]
    async fn test_get_all_contacts_requires_grant() {
        let provider = MobileContactsProvider::new(Box::new(FixedStore {
            status: "undetermined",
            contacts: vec![NativeContact::default()],
        }));

        let err = provider.get_all_contacts().await.unwrap_err();
        assert!(matches!(err, DiscoveryError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_keeps_contacts_without_identifiers() {
        let provider = MobileContactsProvider::new(Box::new(FixedStore {
            status: "granted",
            contacts: vec![
                NativeContact {
                    id: "1".into(),
                    first_name: Some("Grace".into()),
                    last_name: Some("Hopper".into()),
                    phone_numbers: vec![
                        NativePhoneNumber { number: Some("555-0100".into()), label: None },
                        NativePhoneNumber { number: None, label: Some("home".into()) },
                    ],
                    ..NativeContact::default()
                },
                NativeContact { id: "2".into(), ..NativeContact::default() },
            ],
        }));

        let contacts = provider.get_all_contacts().await.unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].name.as_deref(), Some("Grace Hopper"));
        assert_eq!(contacts[0].phone_numbers, vec!["555-0100".to_string()]);
        assert!(!contacts[1].has_identifiers());
    }
}
