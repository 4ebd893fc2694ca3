use std::collections::TryReserveError;

use adcbatt_platform::RegistryError;

/// Errors that prevent a battery monitor from being created.
#[derive(Debug, thiserror::Error)]
pub enum GaugeError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("out of memory building the lookup table: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("could not register power supply: {0}")]
    Registry(#[from] RegistryError),

    #[error("platform init failed: {0}")]
    PlatformInit(String),

    #[error("no tokio runtime to run the poll task on")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, GaugeError>;
