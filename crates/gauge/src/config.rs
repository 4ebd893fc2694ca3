//! Calibration data supplied when a monitor is attached.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GaugeError, Result};
use crate::state::PollIntervals;

/// One calibration point: at `voltage` the pack holds `percent` charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub voltage: i32,
    pub percent: u8,
}

impl Threshold {
    pub const fn new(voltage: i32, percent: u8) -> Self {
        Self { voltage, percent }
    }
}

/// Open-circuit curve of a single Li-ion cell in millivolts.
pub const LI_ION_THRESHOLDS: [Threshold; 8] = [
    Threshold::new(3300, 0),
    Threshold::new(3600, 10),
    Threshold::new(3700, 30),
    Threshold::new(3800, 60),
    Threshold::new(3900, 75),
    Threshold::new(4000, 85),
    Threshold::new(4100, 95),
    Threshold::new(4200, 100),
];

fn default_name() -> String {
    "battery".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Name the battery is registered under.
    #[serde(default = "default_name")]
    pub name: String,
    /// Voltage to charge calibration, ascending by voltage.
    pub thresholds: Vec<Threshold>,
    pub voltage_channel: u32,
    pub temperature_channel: u32,
    /// Registry name of the charger feeding this battery, if any.
    pub charger: Option<String>,
    pub use_for_apm: bool,
    pub poll_interval_ms: u64,
    pub charging_poll_interval_ms: u64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            thresholds: LI_ION_THRESHOLDS.to_vec(),
            voltage_channel: 0,
            temperature_channel: 1,
            charger: None,
            use_for_apm: false,
            poll_interval_ms: 10_000,
            charging_poll_interval_ms: 2_000,
        }
    }
}

impl BatteryConfig {
    /// Check everything except the thresholds, which the lookup table
    /// validates while it is built.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GaugeError::Configuration(
                "battery name must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.charging_poll_interval_ms == 0 {
            return Err(GaugeError::Configuration(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        if self.charger.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(GaugeError::Configuration(
                "charger name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            discharging: Duration::from_millis(self.poll_interval_ms),
            charging: Duration::from_millis(self.charging_poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BatteryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.intervals(), PollIntervals::default());
    }

    #[test]
    fn test_rejects_empty_name() {
        let config = BatteryConfig {
            name: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GaugeError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = BatteryConfig {
            charging_poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_partial_toml() {
        let config: BatteryConfig = toml::from_str(
            r#"
            name = "main-battery"
            charger = "ac"
            thresholds = [
                { voltage = 3400, percent = 0 },
                { voltage = 4200, percent = 100 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "main-battery");
        assert_eq!(config.charger.as_deref(), Some("ac"));
        assert_eq!(config.thresholds.len(), 2);
        assert_eq!(config.poll_interval_ms, 10_000);
        assert_eq!(config.voltage_channel, 0);
    }
}
