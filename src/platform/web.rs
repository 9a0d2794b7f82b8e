use async_trait::async_trait;

use super::ContactsPlatformProvider;
use crate::error::{DiscoveryError, Result};
use crate::models::{ContactPermissionStatus, RawContact};
use crate::validation::InputValidator;

/// Properties the browser picker can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactProperty {
    /// Display names
    Name,
    /// Telephone numbers
    Tel,
    /// Email addresses
    Email,
}

impl ContactProperty {
    /// Property name understood by the picker
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Tel => "tel",
            Self::Email => "email",
        }
    }
}

/// One entry selected in the browser picker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedContact {
    /// Names, first one is used
    pub name: Vec<String>,
    /// Telephone numbers
    pub tel: Vec<String>,
    /// Email addresses
    pub email: Vec<String>,
}

/// Binding to a browser contact picker
#[async_trait]
pub trait ContactPicker: Send + Sync {
    /// Runtime feature detection
    fn is_available(&self) -> bool;

    /// Open the picker and return the user's selection
    async fn select(
        &self,
        properties: &[ContactProperty],
        multiple: bool,
    ) -> anyhow::Result<Vec<PickedContact>>;
}

const REQUESTED_PROPERTIES: [ContactProperty; 3] =
    [ContactProperty::Name, ContactProperty::Tel, ContactProperty::Email];

/// Provider for browsers, backed by an optional contact picker.
///
/// The picker asks for consent on every use, so a supported picker reports
/// `Granted` and an unsupported one `Denied`.
pub struct WebContactsProvider {
    picker: Option<Box<dyn ContactPicker>>,
}

impl WebContactsProvider {
    /// Wrap a picker binding, if the host exposes one
    #[must_use]
    pub fn new(picker: Option<Box<dyn ContactPicker>>) -> Self {
        Self { picker }
    }

    fn supported_picker(&self) -> Option<&dyn ContactPicker> {
        self.picker.as_deref().filter(|picker| picker.is_available())
    }

    fn status(&self) -> ContactPermissionStatus {
        if self.supported_picker().is_some() {
            ContactPermissionStatus::Granted
        } else {
            ContactPermissionStatus::Denied
        }
    }
}

#[async_trait]
impl ContactsPlatformProvider for WebContactsProvider {
    async fn request_permission(&self) -> Result<ContactPermissionStatus> {
        Ok(self.status())
    }

    async fn get_permission_status(&self) -> Result<ContactPermissionStatus> {
        Ok(self.status())
    }

    async fn get_all_contacts(&self) -> Result<Vec<RawContact>> {
        let picker = self.supported_picker().ok_or_else(|| {
            DiscoveryError::NotSupported("Contact Picker API is not available".to_string())
        })?;

        let picked = picker.select(&REQUESTED_PROPERTIES, true).await?;

        Ok(picked
            .into_iter()
            .enumerate()
            .map(|(index, contact)| RawContact {
                id: format!("web-contact-{index}"),
                name: contact
                    .name
                    .first()
                    .and_then(|n| InputValidator::sanitize_name(n)),
                phone_numbers: contact.tel,
                emails: contact.email,
            })
            .collect())
    }

    fn is_supported(&self) -> bool {
        self.supported_picker().is_some()
    }
}
