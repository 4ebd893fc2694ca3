//! The battery monitor: one per physical battery.
//!
//! A single worker task owns all sampling. It sleeps until the next poll
//! deadline or until a command arrives, whichever is first. Handling a
//! command drops the pending sleep, so an evaluation always cancels the
//! armed poll before it samples and then re-arms it with the new interval.
//! Property reads go through [`Shared`] and never touch the worker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use adcbatt_platform::{
    AdcSource, Charger, NoHooks, PlatformHooks, Property, PropertyError, PropertyProvider,
    PropertyValue, Status, SupplyDescriptor, SupplyKind, SupplyRegistry,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::BatteryConfig;
use crate::error::{GaugeError, Result};
use crate::lookup::LookupTable;
use crate::properties::{convert_temperature, BatteryProperties, Snapshot, BATTERY_PROPERTIES};
use crate::state::{ChargeStateMachine, Transition};
use crate::window::SampleWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Evaluate,
    Suspend,
    Resume,
    Shutdown,
}

/// What property readers see. The charge state machine itself lives in the
/// worker so charger calls never run under this lock.
struct MonitorState {
    window: SampleWindow,
    voltage: i32,
    temperature_raw: i32,
    status: Status,
    plugged: bool,
    interval: Duration,
}

/// State shared between the worker and property readers.
pub(crate) struct Shared {
    name: String,
    table: LookupTable,
    state: Mutex<MonitorState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let state = self.state();
        Snapshot {
            status: state.status,
            plugged: state.plugged,
            voltage_now: state.voltage,
            charge_now: self.table.percentage_for(state.voltage),
            temperature: convert_temperature(state.temperature_raw),
            temperature_raw: state.temperature_raw,
            poll_interval: state.interval,
        }
    }
}

/// Charger handle resolved by name on first use and cached afterwards.
struct ChargerLink {
    name: Option<String>,
    resolved: Option<Arc<dyn Charger>>,
}

impl ChargerLink {
    fn get(&mut self, registry: &dyn SupplyRegistry) -> Option<Arc<dyn Charger>> {
        if self.resolved.is_none() {
            if let Some(name) = &self.name {
                self.resolved = registry.charger(name);
                if self.resolved.is_some() {
                    debug!(charger = %name, "charger resolved");
                }
            }
        }
        self.resolved.clone()
    }
}

struct Worker {
    shared: Arc<Shared>,
    adc: Arc<dyn AdcSource>,
    registry: Arc<dyn SupplyRegistry>,
    charger: ChargerLink,
    machine: ChargeStateMachine,
    voltage_channel: u32,
    temperature_channel: u32,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Worker {
    async fn run(mut self) {
        let mut next_poll = None;
        let mut suspended = false;

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Evaluate) if suspended => {
                        debug!(battery = %self.shared.name, "evaluation deferred until resume");
                    }
                    Some(Command::Evaluate) => {
                        let interval = self.evaluate();
                        next_poll = Some(Instant::now() + interval);
                    }
                    Some(Command::Suspend) => {
                        suspended = true;
                        next_poll = None;
                        debug!(battery = %self.shared.name, "polling suspended");
                    }
                    Some(Command::Resume) => {
                        suspended = false;
                        let interval = self.evaluate();
                        next_poll = Some(Instant::now() + interval);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = sleep_until(next_poll) => {
                    self.sample();
                    next_poll = Some(Instant::now() + self.machine.interval());
                }
            }
        }

        debug!(battery = %self.shared.name, "poll task stopped");
    }

    fn evaluate(&mut self) -> Duration {
        let is_plugged = self.registry.is_supplied(&self.shared.name);
        let charger = self.charger.get(self.registry.as_ref());

        // Chargers may read the battery back, so the state lock must not be
        // held here.
        let transition = self.machine.evaluate(is_plugged, charger.as_deref());
        {
            let mut state = self.shared.state();
            state.status = transition.to;
            state.plugged = transition.plugged;
            state.interval = transition.interval;
        }
        log_transition(&self.shared.name, &transition);

        self.sample();
        self.registry.changed(&self.shared.name);

        transition.interval
    }

    fn sample(&self) {
        let voltage = self.adc.read(self.voltage_channel);
        let temperature = self.adc.read(self.temperature_channel);

        let mut state = self.shared.state();
        match voltage {
            Ok(sample) => state.voltage = state.window.push(sample),
            Err(e) => warn!(battery = %self.shared.name, error = %e, "voltage sample dropped"),
        }
        match temperature {
            Ok(sample) => state.temperature_raw = sample,
            Err(e) => warn!(battery = %self.shared.name, error = %e, "temperature sample dropped"),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn log_transition(name: &str, t: &Transition) {
    if t.status_changed() {
        info!(
            battery = %name,
            from = %t.from,
            to = %t.to,
            plugged = t.plugged,
            interval_ms = t.interval.as_millis() as u64,
            "battery status changed"
        );
    } else {
        debug!(
            battery = %name,
            status = %t.to,
            plugged = t.plugged,
            "battery status unchanged"
        );
    }
}

/// A running battery monitor.
///
/// Created with [`BatteryMonitor::attach`], torn down with
/// [`BatteryMonitor::detach`]. Only `detach` waits for the poll task to
/// stop. Dropping the monitor aborts the task and unregisters the battery
/// without waiting: on a multi-thread runtime an in-flight sample or
/// `changed` notification may still finish after `drop` returns. The
/// platform exit hook is skipped.
pub struct BatteryMonitor {
    shared: Arc<Shared>,
    provider: Arc<BatteryProperties>,
    commands: mpsc::UnboundedSender<Command>,
    worker: Option<JoinHandle<()>>,
    registry: Arc<dyn SupplyRegistry>,
    hooks: Arc<dyn PlatformHooks>,
}

impl BatteryMonitor {
    /// Build the lookup table, prime the averager, register with the
    /// registry and start polling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(
        config: &BatteryConfig,
        adc: Arc<dyn AdcSource>,
        registry: Arc<dyn SupplyRegistry>,
    ) -> Result<Self> {
        Self::attach_with_hooks(config, adc, registry, Arc::new(NoHooks))
    }

    pub fn attach_with_hooks(
        config: &BatteryConfig,
        adc: Arc<dyn AdcSource>,
        registry: Arc<dyn SupplyRegistry>,
        hooks: Arc<dyn PlatformHooks>,
    ) -> Result<Self> {
        config.validate()?;
        let table = LookupTable::new(&config.thresholds)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| GaugeError::NoRuntime)?;

        let machine = ChargeStateMachine::new(config.intervals());
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            table,
            state: Mutex::new(MonitorState {
                window: SampleWindow::new(),
                voltage: -1,
                temperature_raw: -1,
                status: machine.status(),
                plugged: machine.is_plugged(),
                interval: machine.interval(),
            }),
        });
        prime(&shared, adc.as_ref(), config.voltage_channel);

        let (commands, receiver) = mpsc::unbounded_channel();
        let provider = Arc::new(BatteryProperties::new(shared.clone()));

        let on_external_change = {
            let commands = commands.clone();
            Box::new(move || {
                let _ = commands.send(Command::Evaluate);
            })
        };
        registry.register(
            SupplyDescriptor {
                name: config.name.clone(),
                kind: SupplyKind::Battery,
                properties: BATTERY_PROPERTIES.to_vec(),
                use_for_apm: config.use_for_apm,
            },
            provider.clone(),
            on_external_change,
        )?;

        if let Err(reason) = hooks.init() {
            warn!(battery = %config.name, %reason, "platform init failed");
            registry.unregister(&config.name);
            return Err(GaugeError::PlatformInit(reason));
        }

        let worker = Worker {
            shared: shared.clone(),
            adc,
            registry: registry.clone(),
            charger: ChargerLink {
                name: config.charger.clone(),
                resolved: None,
            },
            machine,
            voltage_channel: config.voltage_channel,
            temperature_channel: config.temperature_channel,
            commands: receiver,
        };
        let worker = runtime.spawn(worker.run());

        // Initial status check.
        let _ = commands.send(Command::Evaluate);

        info!(
            battery = %config.name,
            thresholds = config.thresholds.len(),
            charger = config.charger.as_deref().unwrap_or("none"),
            "battery monitor attached"
        );

        Ok(Self {
            shared,
            provider,
            commands,
            worker: Some(worker),
            registry,
            hooks,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn table(&self) -> &LookupTable {
        &self.shared.table
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    pub fn get_property(
        &self,
        property: Property,
    ) -> std::result::Result<PropertyValue, PropertyError> {
        self.provider.get_property(property)
    }

    /// The provider registered on the battery's behalf.
    pub fn provider(&self) -> Arc<dyn PropertyProvider> {
        self.provider.clone()
    }

    /// Schedule a status evaluation, as the registry does when an upstream
    /// supply changes.
    pub fn external_power_changed(&self) {
        self.send(Command::Evaluate);
    }

    /// Stop polling until [`BatteryMonitor::resume`].
    pub fn suspend(&self) {
        self.send(Command::Suspend);
    }

    /// Re-check status and restart polling.
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Unregister, stop the poll task and wait for it to finish, then run
    /// the platform exit hook.
    pub async fn detach(mut self) {
        self.registry.unregister(&self.shared.name);
        self.send(Command::Shutdown);

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!(battery = %self.shared.name, error = %e, "poll task ended abnormally");
            }
        }

        self.hooks.exit();
        info!(battery = %self.shared.name, "battery monitor detached");
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!(battery = %self.shared.name, ?command, "poll task is gone");
        }
    }
}

impl Drop for BatteryMonitor {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            self.registry.unregister(&self.shared.name);
        }
    }
}

/// Fill the averaging window so the first published voltage is meaningful.
fn prime(shared: &Shared, adc: &dyn AdcSource, channel: u32) {
    let mut state = shared.state();
    for _ in 0..state.window.capacity() {
        match adc.read(channel) {
            Ok(sample) => state.voltage = state.window.push(sample),
            Err(e) => warn!(battery = %shared.name, error = %e, "priming sample dropped"),
        }
    }
}
