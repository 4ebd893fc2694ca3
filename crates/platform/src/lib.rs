//! Collaborator contracts for the adcbatt fuel gauge.
//!
//! The gauge itself only knows about traits: an [`AdcSource`] to sample
//! from, a [`Charger`] it can command, a [`SupplyRegistry`] it publishes
//! into and optional [`PlatformHooks`]. This crate defines those traits
//! together with the shared property vocabulary, plus implementations.
//!
//! # Features
//!
//! - `linux` - Enable the sysfs/IIO backed collaborators
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use adcbatt_platform::sim::{SimCharger, SimRegistry};
//! use adcbatt_platform::SupplyRegistry;
//!
//! let registry = SimRegistry::new();
//! registry.add_charger(Arc::new(SimCharger::new("ac").supplies("battery")));
//! registry.set_online("ac", true);
//! assert!(registry.is_supplied("battery"));
//! ```

mod adc;
mod charger;
mod supply;
mod types;

pub mod sim;

pub use adc::{AdcSource, SampleError};
pub use charger::{Charger, ChargerError};
pub use supply::{
    ExternalPowerCallback, NoHooks, PlatformHooks, PropertyProvider, RegistryError,
    SupplyDescriptor, SupplyRegistry,
};
pub use types::{ChargeType, Property, PropertyError, PropertyValue, Status, SupplyKind};

#[cfg(target_os = "linux")]
#[cfg(feature = "linux")]
pub mod linux;
