//! What the battery publishes to the registry.

use std::sync::Arc;
use std::time::Duration;

use adcbatt_platform::{Property, PropertyError, PropertyProvider, PropertyValue, Status};
use serde::Serialize;

use crate::lookup::FULL_MILLI_PERCENT;
use crate::monitor::Shared;

pub const CHARGE_FULL_DESIGN: i32 = FULL_MILLI_PERCENT;
pub const CHARGE_EMPTY_DESIGN: i32 = 0;

/// Reported battery temperature until a thermistor table exists.
pub const PLACEHOLDER_TEMPERATURE: i32 = 22_000;

/// Properties a battery answers for, in publication order.
pub const BATTERY_PROPERTIES: [Property; 6] = [
    Property::Status,
    Property::ChargeFullDesign,
    Property::ChargeEmptyDesign,
    Property::ChargeNow,
    Property::VoltageNow,
    Property::Temperature,
];

/// Turn a raw temperature sample into the published temperature.
// TODO: replace with a per-board thermistor lookup table once calibration
// data for the NTC on the battery connector is available.
pub fn convert_temperature(_raw: i32) -> i32 {
    PLACEHOLDER_TEMPERATURE
}

/// Every published value, read under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub status: Status,
    pub plugged: bool,
    /// Averaged voltage sample.
    pub voltage_now: i32,
    /// Charge in milli-percent.
    pub charge_now: i32,
    pub temperature: i32,
    pub temperature_raw: i32,
    #[serde(serialize_with = "serialize_millis")]
    pub poll_interval: Duration,
}

impl Snapshot {
    /// Charge as a whole-number percentage.
    pub fn capacity_percent(&self) -> i32 {
        self.charge_now / 1000
    }

    pub fn get(&self, property: Property) -> Result<PropertyValue, PropertyError> {
        match property {
            Property::Status => Ok(PropertyValue::Status(self.status)),
            Property::ChargeFullDesign => Ok(PropertyValue::Int(CHARGE_FULL_DESIGN)),
            Property::ChargeEmptyDesign => Ok(PropertyValue::Int(CHARGE_EMPTY_DESIGN)),
            Property::ChargeNow => Ok(PropertyValue::Int(self.charge_now)),
            Property::VoltageNow => Ok(PropertyValue::Int(self.voltage_now)),
            Property::Temperature => Ok(PropertyValue::Int(self.temperature)),
            other => Err(PropertyError::Unsupported(other)),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// The provider handed to the registry.
pub(crate) struct BatteryProperties {
    shared: Arc<Shared>,
}

impl BatteryProperties {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl PropertyProvider for BatteryProperties {
    fn properties(&self) -> &[Property] {
        &BATTERY_PROPERTIES
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, PropertyError> {
        self.shared.snapshot().get(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            status: Status::Charging,
            plugged: true,
            voltage_now: 3600,
            charge_now: 25_000,
            temperature: PLACEHOLDER_TEMPERATURE,
            temperature_raw: 812,
            poll_interval: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_supported_properties() {
        let s = snapshot();
        assert_eq!(
            s.get(Property::Status),
            Ok(PropertyValue::Status(Status::Charging))
        );
        assert_eq!(
            s.get(Property::ChargeFullDesign),
            Ok(PropertyValue::Int(100_000))
        );
        assert_eq!(s.get(Property::ChargeEmptyDesign), Ok(PropertyValue::Int(0)));
        assert_eq!(s.get(Property::ChargeNow), Ok(PropertyValue::Int(25_000)));
        assert_eq!(s.get(Property::VoltageNow), Ok(PropertyValue::Int(3600)));
        assert_eq!(s.get(Property::Temperature), Ok(PropertyValue::Int(22_000)));
    }

    #[test]
    fn test_everything_else_is_unsupported() {
        let s = snapshot();
        for property in Property::ALL {
            let result = s.get(property);
            if BATTERY_PROPERTIES.contains(&property) {
                assert!(result.is_ok());
            } else {
                assert_eq!(result, Err(PropertyError::Unsupported(property)));
            }
        }
    }

    #[test]
    fn test_temperature_is_placeholder() {
        assert_eq!(convert_temperature(0), PLACEHOLDER_TEMPERATURE);
        assert_eq!(convert_temperature(4095), PLACEHOLDER_TEMPERATURE);
    }

    #[test]
    fn test_capacity_percent() {
        assert_eq!(snapshot().capacity_percent(), 25);
    }
}
