//! Shared types for battery and charger monitoring.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Battery charging status as published by the fuel gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Battery is discharging (on battery power)
    #[default]
    Discharging,
    /// Battery is actively charging
    Charging,
    /// External power connected and the charger reports the pack is full
    Full,
}

impl Status {
    /// Returns a human-readable label for the status.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Discharging => "On Battery",
            Status::Charging => "Charging",
            Status::Full => "Full",
        }
    }

    /// Returns the string the kernel power-supply class uses for this status.
    pub fn as_sysfs(&self) -> &'static str {
        match self {
            Status::Discharging => "Discharging",
            Status::Charging => "Charging",
            Status::Full => "Full",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What a charger reports about the charge it is delivering.
///
/// Ordered the same way as the kernel's `POWER_SUPPLY_CHARGE_TYPE_*`
/// constants, so `Unknown < None < Fast`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    #[default]
    Unknown,
    None,
    Fast,
}

impl ChargeType {
    /// True when the charger is still pushing charge into the pack.
    ///
    /// `Unknown` counts as finished, a charger that cannot tell us anything
    /// is not allowed to keep the battery in the charging state.
    pub fn is_charging(&self) -> bool {
        *self > ChargeType::None
    }

    pub fn as_sysfs(&self) -> &'static str {
        match self {
            ChargeType::Unknown => "Unknown",
            ChargeType::None => "N/A",
            ChargeType::Fast => "Fast",
        }
    }

    /// Parse the value found in a sysfs `charge_type` attribute.
    ///
    /// Trickle, standard and the other vendor modes are all treated as
    /// `Fast`: the gauge only cares whether charge is still flowing.
    pub fn from_sysfs(value: &str) -> Self {
        match value.trim() {
            "N/A" | "None" => ChargeType::None,
            "Unknown" | "" => ChargeType::Unknown,
            _ => ChargeType::Fast,
        }
    }
}

impl fmt::Display for ChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sysfs())
    }
}

/// Kind of supply a registry entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyKind {
    Battery,
    Mains,
    Usb,
}

/// Property vocabulary shared by every supply in a registry.
///
/// A provider only implements a subset; asking for anything else yields
/// [`PropertyError::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Status,
    ChargeType,
    Online,
    Present,
    ChargeFullDesign,
    ChargeEmptyDesign,
    ChargeNow,
    VoltageNow,
    CurrentNow,
    Temperature,
    Capacity,
    Technology,
}

impl Property {
    pub const ALL: [Property; 12] = [
        Property::Status,
        Property::ChargeType,
        Property::Online,
        Property::Present,
        Property::ChargeFullDesign,
        Property::ChargeEmptyDesign,
        Property::ChargeNow,
        Property::VoltageNow,
        Property::CurrentNow,
        Property::Temperature,
        Property::Capacity,
        Property::Technology,
    ];

    /// Name of the matching sysfs attribute.
    pub fn attribute(&self) -> &'static str {
        match self {
            Property::Status => "status",
            Property::ChargeType => "charge_type",
            Property::Online => "online",
            Property::Present => "present",
            Property::ChargeFullDesign => "charge_full_design",
            Property::ChargeEmptyDesign => "charge_empty_design",
            Property::ChargeNow => "charge_now",
            Property::VoltageNow => "voltage_now",
            Property::CurrentNow => "current_now",
            Property::Temperature => "temp",
            Property::Capacity => "capacity",
            Property::Technology => "technology",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Value of a single property read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i32),
    Bool(bool),
    Status(Status),
    ChargeType(ChargeType),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            PropertyValue::Status(s) => f.write_str(s.as_sysfs()),
            PropertyValue::ChargeType(t) => f.write_str(t.as_sysfs()),
        }
    }
}

/// Errors returned from [`crate::PropertyProvider`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    #[error("property {0} is not supported")]
    Unsupported(Property),

    #[error("property {0} is read-only")]
    ReadOnly(Property),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Charging.label(), "Charging");
        assert_eq!(Status::Discharging.label(), "On Battery");
        assert_eq!(Status::Full.label(), "Full");
    }

    #[test]
    fn test_status_default_is_discharging() {
        assert_eq!(Status::default(), Status::Discharging);
    }

    #[test]
    fn test_charge_type_ordering() {
        assert!(ChargeType::Unknown < ChargeType::None);
        assert!(ChargeType::None < ChargeType::Fast);
        assert!(ChargeType::Fast.is_charging());
        assert!(!ChargeType::None.is_charging());
        assert!(!ChargeType::Unknown.is_charging());
    }

    #[test]
    fn test_charge_type_sysfs_parsing() {
        assert_eq!(ChargeType::from_sysfs("Fast\n"), ChargeType::Fast);
        assert_eq!(ChargeType::from_sysfs("Trickle"), ChargeType::Fast);
        assert_eq!(ChargeType::from_sysfs("N/A"), ChargeType::None);
        assert_eq!(ChargeType::from_sysfs("Unknown"), ChargeType::Unknown);
        assert_eq!(ChargeType::from_sysfs(""), ChargeType::Unknown);
    }

    #[test]
    fn test_property_value_display() {
        assert_eq!(PropertyValue::Int(-42).to_string(), "-42");
        assert_eq!(PropertyValue::Bool(true).to_string(), "1");
        assert_eq!(PropertyValue::Status(Status::Full).to_string(), "Full");
    }

    #[test]
    fn test_property_error_message() {
        let err = PropertyError::Unsupported(Property::CurrentNow);
        assert_eq!(err.to_string(), "property current_now is not supported");
    }
}
