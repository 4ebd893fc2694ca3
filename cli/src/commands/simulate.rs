use std::sync::Arc;
use std::time::Duration;

use adcbatt_gauge::BatteryMonitor;
use adcbatt_platform::sim::{SimAdc, SimCharger, SimRegistry};
use adcbatt_platform::Charger;
use color_eyre::eyre::{bail, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::SimulateArgs;
use crate::config::{SimulationConfig, UserConfig};

const DEFAULT_CHARGER: &str = "gpio-charger";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Phase {
    Draining,
    Charging,
    Topped,
}

/// What the scenario does to the simulated charger on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    PlugIn,
    ChargeDone,
    Unplug,
}

/// Scripted pack voltage: drain to `low_mv`, plug in, charge to `high_mv`,
/// let the charger terminate, unplug, repeat.
#[derive(Debug, Clone)]
struct Scenario {
    level: i32,
    phase: Phase,
    low_mv: i32,
    high_mv: i32,
    step_mv: i32,
}

impl Scenario {
    fn new(sim: &SimulationConfig, start_mv: i32) -> Self {
        Self {
            level: start_mv,
            phase: Phase::Draining,
            low_mv: sim.low_mv,
            high_mv: sim.high_mv,
            step_mv: sim.step_mv,
        }
    }

    fn step(&mut self) -> Option<Action> {
        match self.phase {
            Phase::Draining => {
                self.level -= self.step_mv;
                if self.level <= self.low_mv {
                    self.phase = Phase::Charging;
                    return Some(Action::PlugIn);
                }
            }
            Phase::Charging => {
                self.level += self.step_mv;
                if self.level >= self.high_mv {
                    self.phase = Phase::Topped;
                    return Some(Action::ChargeDone);
                }
            }
            Phase::Topped => {
                self.phase = Phase::Draining;
                return Some(Action::Unplug);
            }
        }
        None
    }
}

fn validate(sim: &SimulationConfig) -> Result<()> {
    if sim.step_mv <= 0 {
        bail!("simulation step_mv must be positive");
    }
    if sim.low_mv >= sim.high_mv {
        bail!(
            "simulation low_mv ({}) must be below high_mv ({})",
            sim.low_mv,
            sim.high_mv
        );
    }
    if sim.tick_ms == 0 {
        bail!("simulation tick_ms must be non-zero");
    }
    Ok(())
}

pub async fn run(config: UserConfig, args: SimulateArgs) -> Result<()> {
    let sim = &config.simulation;
    validate(sim)?;

    let battery = &config.battery;
    let charger_name = battery.charger.as_deref().unwrap_or(DEFAULT_CHARGER);
    let start_mv = args.start.unwrap_or(sim.start_mv);
    let tick = args.tick.unwrap_or(Duration::from_millis(sim.tick_ms));

    let adc = Arc::new(
        SimAdc::new()
            .with_channel(battery.voltage_channel, start_mv)
            .with_channel(battery.temperature_channel, sim.temperature_raw),
    );
    let charger = Arc::new(SimCharger::new(charger_name).supplies(battery.name.as_str()));
    let registry = Arc::new(SimRegistry::new());
    registry.add_charger(charger.clone());

    let monitor = BatteryMonitor::attach(battery, adc.clone(), registry.clone())?;
    info!(battery = %battery.name, charger = charger_name, start_mv, "simulation started");

    let mut scenario = Scenario::new(sim, start_mv);
    let mut ticker = tokio::time::interval(tick);
    let mut counter = 0u32;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        if counter > 0 {
            let action = scenario.step();
            adc.set_level(battery.voltage_channel, scenario.level);
            if let Some(action) = action {
                apply(&registry, charger_name, action);
            }
        }
        // Let the monitor handle whatever the step triggered.
        tokio::task::yield_now().await;

        let snapshot = monitor.snapshot();
        let doc = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "tick": counter,
            "phase": scenario.phase,
            "adc_mv": scenario.level,
            "capacity_percent": snapshot.capacity_percent(),
            "status_label": snapshot.status.label(),
            "battery": snapshot,
            "charger": {
                "name": charger.name(),
                "online": charger.is_online(),
                "enabled": charger.is_enabled(),
                "charge_type": charger.charge_type(),
            },
        });

        if args.compact {
            println!("{}", serde_json::to_string(&doc)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }

        counter += 1;
        if args.samples > 0 && counter >= args.samples {
            break;
        }
    }

    monitor.detach().await;
    Ok(())
}

fn apply(registry: &SimRegistry, charger: &str, action: Action) {
    debug!(?action, "scenario step");
    match action {
        Action::PlugIn => {
            registry.set_online(charger, true);
            registry.set_charging(charger, true);
        }
        Action::ChargeDone => registry.set_charging(charger, false),
        Action::Unplug => registry.set_online(charger, false),
    }
}

#[cfg(test)]
mod tests {
    use adcbatt_platform::ChargeType;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sim() -> SimulationConfig {
        SimulationConfig {
            low_mv: 3500,
            high_mv: 3600,
            step_mv: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_scenario_runs_a_full_cycle() {
        let mut scenario = Scenario::new(&sim(), 3600);
        let steps: Vec<_> = (0..7).map(|_| (scenario.step(), scenario.level)).collect();

        assert_eq!(
            steps,
            vec![
                (None, 3550),
                (Some(Action::PlugIn), 3500),
                (None, 3550),
                (Some(Action::ChargeDone), 3600),
                (Some(Action::Unplug), 3600),
                (None, 3550),
                (Some(Action::PlugIn), 3500),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(validate(&SimulationConfig::default()).is_ok());
        assert!(validate(&SimulationConfig {
            step_mv: 0,
            ..sim()
        })
        .is_err());
        assert!(validate(&SimulationConfig {
            low_mv: 3600,
            ..sim()
        })
        .is_err());
    }

    #[test]
    fn test_apply_drives_the_charger() {
        let registry = Arc::new(SimRegistry::new());
        let charger = Arc::new(SimCharger::new(DEFAULT_CHARGER).supplies("battery"));
        registry.add_charger(charger.clone());

        apply(&registry, DEFAULT_CHARGER, Action::PlugIn);
        assert!(charger.is_online());
        assert_eq!(charger.charge_type(), ChargeType::Fast);

        apply(&registry, DEFAULT_CHARGER, Action::ChargeDone);
        assert_eq!(charger.charge_type(), ChargeType::None);

        apply(&registry, DEFAULT_CHARGER, Action::Unplug);
        assert!(!charger.is_online());
    }
}
