//! Charging state machine.
//!
//! Decides between Discharging, Charging and Full from plug presence and the
//! charger's own report, and picks how often the battery should be polled.

use std::time::Duration;

use adcbatt_platform::{ChargeType, Charger, ChargerError, Status};
use tracing::{debug, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const CHARGING_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll periods for the two regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Used while discharging or full.
    pub discharging: Duration,
    /// Used while charging, when voltage moves quickly.
    pub charging: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            discharging: DEFAULT_POLL_INTERVAL,
            charging: CHARGING_POLL_INTERVAL,
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
    pub plugged: bool,
    pub plug_changed: bool,
    pub interval: Duration,
}

impl Transition {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone)]
pub struct ChargeStateMachine {
    status: Status,
    plugged: bool,
    was_plugged: bool,
    interval: Duration,
    intervals: PollIntervals,
}

impl Default for ChargeStateMachine {
    fn default() -> Self {
        Self::new(PollIntervals::default())
    }
}

impl ChargeStateMachine {
    pub fn new(intervals: PollIntervals) -> Self {
        Self {
            status: Status::Discharging,
            plugged: false,
            was_plugged: false,
            interval: intervals.discharging,
            intervals,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_plugged(&self) -> bool {
        self.plugged
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Re-evaluate with the current plug state.
    ///
    /// Charger commands are best effort: a charger that cannot take them, or
    /// no charger at all, never stops the status from changing.
    pub fn evaluate(&mut self, is_plugged: bool, charger: Option<&dyn Charger>) -> Transition {
        let from = self.status;
        self.plugged = is_plugged;
        let plug_changed = is_plugged != self.was_plugged;

        if plug_changed {
            self.was_plugged = is_plugged;
            if is_plugged {
                command(charger, ChargeType::Fast);
                self.enter(Status::Charging);
            } else {
                command(charger, ChargeType::None);
                self.enter(Status::Discharging);
            }
        } else if is_plugged {
            if charge_finished(charger) {
                command(charger, ChargeType::None);
                self.enter(Status::Full);
            } else {
                command(charger, ChargeType::Fast);
                self.enter(Status::Charging);
            }
        }

        Transition {
            from,
            to: self.status,
            plugged: is_plugged,
            plug_changed,
            interval: self.interval,
        }
    }

    fn enter(&mut self, status: Status) {
        self.status = status;
        self.interval = match status {
            Status::Charging => self.intervals.charging,
            Status::Discharging | Status::Full => self.intervals.discharging,
        };
    }
}

/// No charger to ask counts as finished.
fn charge_finished(charger: Option<&dyn Charger>) -> bool {
    charger.map_or(true, |c| !c.charge_type().is_charging())
}

fn command(charger: Option<&dyn Charger>, charge_type: ChargeType) {
    let Some(charger) = charger else {
        return;
    };

    match charger.set_charge_type(charge_type) {
        Ok(()) => debug!(charger = charger.name(), %charge_type, "charger commanded"),
        Err(ChargerError::Unsupported) => {
            trace!(charger = charger.name(), "charger cannot change charge type")
        }
        Err(e) => warn!(charger = charger.name(), error = %e, "charger command failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use adcbatt_platform::sim::{SimCharger, SimRegistry};

    use super::*;

    struct Broken;

    impl Charger for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn charge_type(&self) -> ChargeType {
            ChargeType::Fast
        }

        fn set_charge_type(&self, _charge_type: ChargeType) -> Result<(), ChargerError> {
            Err(ChargerError::Io("bus error".to_string()))
        }
    }

    fn charger_with_registry() -> (Arc<SimCharger>, SimRegistry) {
        let charger = Arc::new(SimCharger::new("ac").supplies("battery"));
        let registry = SimRegistry::new();
        registry.add_charger(charger.clone());
        (charger, registry)
    }

    #[test]
    fn test_initial_state() {
        let machine = ChargeStateMachine::default();
        assert_eq!(machine.status(), Status::Discharging);
        assert_eq!(machine.interval(), DEFAULT_POLL_INTERVAL);
        assert!(!machine.is_plugged());
    }

    #[test]
    fn test_still_unplugged_changes_nothing() {
        let (charger, _registry) = charger_with_registry();
        let mut machine = ChargeStateMachine::default();

        let t = machine.evaluate(false, Some(charger.as_ref()));
        assert!(!t.plug_changed);
        assert!(!t.status_changed());
        assert_eq!(t.interval, DEFAULT_POLL_INTERVAL);
        assert!(charger.commands().is_empty());
    }

    #[test]
    fn test_plugging_in_starts_fast_charge() {
        let (charger, _registry) = charger_with_registry();
        let mut machine = ChargeStateMachine::default();

        let t = machine.evaluate(true, Some(charger.as_ref()));
        assert!(t.plug_changed);
        assert_eq!(t.to, Status::Charging);
        assert_eq!(t.interval, CHARGING_POLL_INTERVAL);
        assert_eq!(charger.commands(), vec![ChargeType::Fast]);
        assert_eq!(charger.is_enabled(), Some(true));
    }

    #[test]
    fn test_plugging_in_from_full_still_charges() {
        let (charger, registry) = charger_with_registry();
        let mut machine = ChargeStateMachine::default();

        machine.evaluate(true, Some(charger.as_ref()));
        machine.evaluate(true, Some(charger.as_ref()));
        assert_eq!(machine.status(), Status::Full);

        machine.evaluate(false, Some(charger.as_ref()));
        registry.set_charging("ac", false);
        let t = machine.evaluate(true, Some(charger.as_ref()));
        assert_eq!(t.from, Status::Discharging);
        assert_eq!(t.to, Status::Charging);
    }

    #[test]
    fn test_unplugging_stops_charge() {
        let (charger, _registry) = charger_with_registry();
        let mut machine = ChargeStateMachine::default();

        machine.evaluate(true, Some(charger.as_ref()));
        let t = machine.evaluate(false, Some(charger.as_ref()));
        assert!(t.plug_changed);
        assert_eq!(t.to, Status::Discharging);
        assert_eq!(t.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(charger.commands(), vec![ChargeType::Fast, ChargeType::None]);
    }

    #[test]
    fn test_charger_feedback_while_plugged() {
        let (charger, registry) = charger_with_registry();
        let mut machine = ChargeStateMachine::default();
        machine.evaluate(true, Some(charger.as_ref()));

        registry.set_charging("ac", true);
        let t = machine.evaluate(true, Some(charger.as_ref()));
        assert_eq!(t.to, Status::Charging);
        assert_eq!(t.interval, CHARGING_POLL_INTERVAL);

        registry.set_charging("ac", false);
        let t = machine.evaluate(true, Some(charger.as_ref()));
        assert_eq!(t.from, Status::Charging);
        assert_eq!(t.to, Status::Full);
        assert_eq!(t.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(charger.commands().last(), Some(&ChargeType::None));
    }

    #[test]
    fn test_unknown_charge_type_counts_as_full() {
        let charger = SimCharger::new("ac").without_status_line();
        let mut machine = ChargeStateMachine::default();

        machine.evaluate(true, Some(&charger));
        let t = machine.evaluate(true, Some(&charger));
        assert_eq!(t.to, Status::Full);
    }

    #[test]
    fn test_without_charger() {
        let mut machine = ChargeStateMachine::default();

        assert_eq!(machine.evaluate(true, None).to, Status::Charging);
        assert_eq!(machine.evaluate(true, None).to, Status::Full);
        assert_eq!(machine.evaluate(false, None).to, Status::Discharging);
    }

    #[test]
    fn test_unsupported_or_failing_commands_are_ignored() {
        let read_only = SimCharger::new("usb").without_enable_line();
        let mut machine = ChargeStateMachine::default();
        assert_eq!(machine.evaluate(true, Some(&read_only)).to, Status::Charging);
        assert!(read_only.commands().is_empty());

        let mut machine = ChargeStateMachine::default();
        assert_eq!(machine.evaluate(true, Some(&Broken)).to, Status::Charging);
        assert_eq!(machine.evaluate(true, Some(&Broken)).to, Status::Charging);
        assert_eq!(machine.evaluate(false, Some(&Broken)).to, Status::Discharging);
    }

    #[test]
    fn test_custom_intervals() {
        let intervals = PollIntervals {
            discharging: Duration::from_secs(60),
            charging: Duration::from_millis(500),
        };
        let mut machine = ChargeStateMachine::new(intervals);
        assert_eq!(machine.interval(), Duration::from_secs(60));
        assert_eq!(machine.evaluate(true, None).interval, Duration::from_millis(500));
    }

    #[test]
    fn test_machines_track_plug_state_independently() {
        let mut first = ChargeStateMachine::default();
        let mut second = ChargeStateMachine::default();

        first.evaluate(true, None);
        let t = second.evaluate(true, None);
        assert!(t.plug_changed);
        assert_eq!(t.to, Status::Charging);
    }
}
