//! Linux collaborators backed by sysfs.
//!
//! * [`IioAdc`] reads raw conversions from an IIO device
//!   (`/sys/bus/iio/devices/iio:deviceN/in_voltageK_raw`).
//! * [`SysfsCharger`] reads and writes a charger's `charge_type` attribute.
//! * [`SysfsRegistry`] answers plug presence from the online mains/USB
//!   supplies under `/sys/class/power_supply` and turns changes into
//!   external-power callbacks when polled.

mod adc;
mod supply;

pub use adc::{IioAdc, IIO_DEVICES_PATH};
pub use supply::{SysfsCharger, SysfsRegistry, POWER_SUPPLY_PATH};
