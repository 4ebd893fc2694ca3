use std::fs;
use std::path::PathBuf;

use adcbatt_gauge::BatteryConfig;
use clap::ValueEnum;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Knobs for the scripted charge cycle run by `adcbatt simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// ADC level the pack starts at.
    pub start_mv: i32,
    /// Plug the charger in once the level drops to this.
    pub low_mv: i32,
    /// The charger terminates once the level reaches this.
    pub high_mv: i32,
    /// Level change per tick.
    pub step_mv: i32,
    pub temperature_raw: i32,
    pub tick_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_mv: 3900,
            low_mv: 3450,
            high_mv: 4200,
            step_mv: 25,
            temperature_raw: 812,
            tick_ms: 500,
        }
    }
}

/// Hardware used by `adcbatt watch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// `name` attribute of the IIO device to sample.
    pub iio_device: String,
    pub power_supply_path: PathBuf,
    pub interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            iio_device: "battery-adc".to_string(),
            power_supply_path: PathBuf::from("/sys/class/power_supply"),
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub log_level: LogLevel,
    pub battery: BatteryConfig,
    pub simulation: SimulationConfig,
    pub watch: WatchConfig,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            battery: BatteryConfig {
                charger: Some("gpio-charger".to_string()),
                ..Default::default()
            },
            simulation: SimulationConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("adcbatt")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("adcbatt")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn ensure_dirs() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())
}

impl UserConfig {
    /// Load the config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: using default config: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn try_load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&path).wrap_err_with(|| format!("reading {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        ensure_dirs()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path(), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use adcbatt_gauge::LI_ION_THRESHOLDS;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = UserConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(UserConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = UserConfig::parse(
            r#"
            log_level = "debug"

            [battery]
            name = "main"
            poll_interval_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.battery.name, "main");
        assert_eq!(config.battery.poll_interval_ms, 5000);
        assert_eq!(config.battery.thresholds, LI_ION_THRESHOLDS.to_vec());
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(UserConfig::parse("log_level = 3").is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::Off.as_tracing_level(), None);
        assert_eq!(LogLevel::Warn.as_tracing_level(), Some(Level::WARN));
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
