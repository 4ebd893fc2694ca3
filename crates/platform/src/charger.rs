//! Charger control traits.

use crate::types::ChargeType;

/// Error from a charger command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChargerError {
    /// The charger has no way to change its charge type.
    #[error("charger does not support changing the charge type")]
    Unsupported,

    #[error("charger I/O failed: {0}")]
    Io(String),
}

/// A charger that can report, and optionally change, its charge type.
pub trait Charger: Send + Sync {
    /// Registry name of the charger.
    fn name(&self) -> &str;

    /// Current charge type as reported by the hardware.
    fn charge_type(&self) -> ChargeType;

    /// Ask the charger to switch charge type.
    ///
    /// The default implementation reports [`ChargerError::Unsupported`];
    /// chargers without an enable line keep it.
    fn set_charge_type(&self, _charge_type: ChargeType) -> Result<(), ChargerError> {
        Err(ChargerError::Unsupported)
    }

    /// Whether [`Charger::set_charge_type`] can succeed at all.
    fn can_set_charge_type(&self) -> bool {
        false
    }
}
