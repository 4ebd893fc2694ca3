//! ADC based battery fuel gauge.
//!
//! Turns raw voltage samples into a charge estimate through a calibrated
//! piecewise-linear table, smooths them with a small running mean and keeps
//! a charge state machine in step with the external supply.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use adcbatt_gauge::{BatteryConfig, BatteryMonitor};
//! use adcbatt_platform::sim::{SimAdc, SimRegistry};
//!
//! # async fn run() -> adcbatt_gauge::Result<()> {
//! let adc = Arc::new(SimAdc::new().with_channel(0, 3750).with_channel(1, 900));
//! let registry = Arc::new(SimRegistry::new());
//!
//! let monitor = BatteryMonitor::attach(&BatteryConfig::default(), adc, registry)?;
//! println!("{}%", monitor.snapshot().capacity_percent());
//! monitor.detach().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod lookup;
mod monitor;
mod properties;
mod state;
mod window;

pub use config::{BatteryConfig, Threshold, LI_ION_THRESHOLDS};
pub use error::{GaugeError, Result};
pub use lookup::{LookupRange, LookupTable, FULL_MILLI_PERCENT};
pub use monitor::BatteryMonitor;
pub use properties::{
    convert_temperature, Snapshot, BATTERY_PROPERTIES, CHARGE_EMPTY_DESIGN, CHARGE_FULL_DESIGN,
    PLACEHOLDER_TEMPERATURE,
};
pub use state::{
    ChargeStateMachine, PollIntervals, Transition, CHARGING_POLL_INTERVAL, DEFAULT_POLL_INTERVAL,
};
pub use window::{SampleWindow, SAMPLE_WINDOW};
