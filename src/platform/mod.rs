//! Contact acquisition from the host platform.
//!
//! Exactly one provider variant is chosen at startup through
//! [`select_provider`]; the sync pipeline only ever talks to the
//! [`ContactsPlatformProvider`] trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContactPermissionStatus, RawContact};

/// JSON address-book export used on desktop hosts
pub mod json_store;
/// OS contact store variant
pub mod mobile;
/// Browser contact picker variant
pub mod web;

pub use json_store::JsonContactStore;
pub use mobile::{MobileContactsProvider, NativeContact, NativeContactStore};
pub use web::{ContactPicker, ContactProperty, PickedContact, WebContactsProvider};

/// Capability set every host platform provides
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactsPlatformProvider: Send + Sync {
    /// Ask the user for contact access
    async fn request_permission(&self) -> Result<ContactPermissionStatus>;

    /// Current contact access state, without prompting
    async fn get_permission_status(&self) -> Result<ContactPermissionStatus>;

    /// Every contact on the device, including ones without identifiers
    async fn get_all_contacts(&self) -> Result<Vec<RawContact>>;

    /// Whether this host can provide contacts at all
    fn is_supported(&self) -> bool;
}

/// Host binding available at startup
pub enum HostPlatform {
    /// Native OS contact store
    Mobile(Box<dyn NativeContactStore>),
    /// Browser; `None` when no picker binding exists at all
    Web(Option<Box<dyn ContactPicker>>),
}

/// Build the provider for the host this process runs on
#[must_use]
pub fn select_provider(host: HostPlatform) -> Box<dyn ContactsPlatformProvider> {
    match host {
        HostPlatform::Mobile(store) => {
            tracing::debug!("Using native contacts provider");
            Box::new(MobileContactsProvider::new(store))
        }
        HostPlatform::Web(picker) => {
            tracing::debug!(picker = picker.is_some(), "Using web contacts provider");
            Box::new(WebContactsProvider::new(picker))
        }
    }
}
