//! Power-supply registry traits.
//!
//! A registry keeps track of every supply in the system (batteries, mains
//! adapters, USB ports), answers "is this battery being fed" and fans out
//! change notifications. The fuel gauge registers itself as a
//! [`PropertyProvider`] and receives an [`ExternalPowerCallback`] whenever an
//! upstream supply changes.

use std::sync::Arc;

use crate::charger::Charger;
use crate::types::{Property, PropertyError, PropertyValue, SupplyKind};

/// Called by the registry when a supply feeding this one changes state.
///
/// Must not block; implementations are expected to hand the work off to
/// their own task.
pub type ExternalPowerCallback = Box<dyn Fn() + Send + Sync>;

/// Description of a supply being registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyDescriptor {
    pub name: String,
    pub kind: SupplyKind,
    pub properties: Vec<Property>,
    /// Battery may back legacy APM emulation.
    pub use_for_apm: bool,
}

/// Read (and optionally write) access to a supply's properties.
pub trait PropertyProvider: Send + Sync {
    /// Properties this provider answers for.
    fn properties(&self) -> &[Property];

    fn get_property(&self, property: Property) -> Result<PropertyValue, PropertyError>;

    fn set_property(&self, property: Property, _value: PropertyValue) -> Result<(), PropertyError> {
        if self.properties().contains(&property) {
            Err(PropertyError::ReadOnly(property))
        } else {
            Err(PropertyError::Unsupported(property))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a supply named {0:?} is already registered")]
    AlreadyRegistered(String),

    #[error("supply registry unavailable: {0}")]
    Unavailable(String),
}

/// The publish/subscribe registry the gauge lives in.
pub trait SupplyRegistry: Send + Sync {
    fn register(
        &self,
        descriptor: SupplyDescriptor,
        provider: Arc<dyn PropertyProvider>,
        on_external_change: ExternalPowerCallback,
    ) -> Result<(), RegistryError>;

    fn unregister(&self, name: &str);

    /// True when any online supply lists `name` among its supplicants.
    fn is_supplied(&self, name: &str) -> bool;

    /// Tell listeners that the properties of `name` changed.
    fn changed(&self, name: &str);

    /// Look up a charger by name.
    fn charger(&self, name: &str) -> Option<Arc<dyn Charger>>;
}

/// Board specific setup and teardown around a monitor's lifetime.
pub trait PlatformHooks: Send + Sync {
    /// Runs after the battery is registered. An error aborts the attach.
    fn init(&self) -> Result<(), String> {
        Ok(())
    }

    /// Runs after the battery is torn down.
    fn exit(&self) {}
}

/// Hooks for boards that need nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl PlatformHooks for NoHooks {}
