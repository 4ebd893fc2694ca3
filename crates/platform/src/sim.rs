//! In-process collaborators for simulation and tests.
//!
//! [`SimAdc`] serves scripted samples, [`SimCharger`] behaves like a
//! GPIO-driven charger (an online line, a "charging" status line and an
//! optional enable line) and [`SimRegistry`] ties them together the way the
//! kernel power-supply class does: a charger changing state calls the
//! external-power callback of every battery it supplies.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::adc::{AdcSource, SampleError};
use crate::charger::{Charger, ChargerError};
use crate::supply::{
    ExternalPowerCallback, PropertyProvider, RegistryError, SupplyDescriptor, SupplyRegistry,
};
use crate::types::{ChargeType, Property, PropertyError, PropertyValue};

const EVENT_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Channel {
    level: i32,
    queued: VecDeque<Result<i32, SampleError>>,
    reads: usize,
}

/// Scripted ADC.
///
/// Each channel holds a steady level plus a queue of one-shot results that
/// are served first, so tests can inject a spike or a failed conversion.
#[derive(Debug, Default)]
pub struct SimAdc {
    channels: Mutex<HashMap<u32, Channel>>,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(self, channel: u32, level: i32) -> Self {
        self.set_level(channel, level);
        self
    }

    /// Set the steady level returned once the queue is drained.
    pub fn set_level(&self, channel: u32, level: i32) {
        lock(&self.channels).entry(channel).or_default().level = level;
    }

    pub fn level(&self, channel: u32) -> Option<i32> {
        lock(&self.channels).get(&channel).map(|c| c.level)
    }

    /// Queue one-shot samples served before the steady level.
    pub fn queue(&self, channel: u32, samples: impl IntoIterator<Item = i32>) {
        let mut channels = lock(&self.channels);
        let entry = channels.entry(channel).or_default();
        entry.queued.extend(samples.into_iter().map(Ok));
    }

    /// Make the next conversion on `channel` fail.
    pub fn fail_next(&self, channel: u32, reason: &str) {
        let mut channels = lock(&self.channels);
        let entry = channels.entry(channel).or_default();
        entry.queued.push_back(Err(SampleError::Conversion {
            channel,
            reason: reason.to_string(),
        }));
    }

    /// Number of conversions taken on `channel` so far.
    pub fn reads(&self, channel: u32) -> usize {
        lock(&self.channels).get(&channel).map_or(0, |c| c.reads)
    }
}

impl AdcSource for SimAdc {
    fn read(&self, channel: u32) -> Result<i32, SampleError> {
        let mut channels = lock(&self.channels);
        let entry = channels
            .get_mut(&channel)
            .ok_or(SampleError::NoSuchChannel(channel))?;
        entry.reads += 1;
        let sample = entry.queued.pop_front().unwrap_or(Ok(entry.level));
        trace!(channel, sample = ?sample, "sim adc read");
        sample
    }
}

/// A charger modelled on a GPIO charger chip.
///
/// * `online` follows the "power good" line.
/// * `charging` follows the charge status line; a charger without one
///   reports [`ChargeType::Unknown`].
/// * The enable line is optional; without it charge type cannot be set.
#[derive(Debug)]
pub struct SimCharger {
    name: String,
    supplied_to: Vec<String>,
    online: AtomicBool,
    charging: Option<AtomicBool>,
    enabled: Option<AtomicBool>,
    commands: Mutex<Vec<ChargeType>>,
}

impl SimCharger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supplied_to: Vec::new(),
            online: AtomicBool::new(false),
            charging: Some(AtomicBool::new(false)),
            enabled: Some(AtomicBool::new(false)),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Add a battery this charger feeds.
    pub fn supplies(mut self, battery: impl Into<String>) -> Self {
        self.supplied_to.push(battery.into());
        self
    }

    /// Drop the enable line: `set_charge_type` becomes unsupported.
    pub fn without_enable_line(mut self) -> Self {
        self.enabled = None;
        self
    }

    /// Drop the status line: `charge_type` reports `Unknown`.
    pub fn without_status_line(mut self) -> Self {
        self.charging = None;
        self
    }

    pub fn supplied_to(&self) -> &[String] {
        &self.supplied_to
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> Option<bool> {
        self.enabled.as_ref().map(|e| e.load(Ordering::SeqCst))
    }

    /// Every charge type successfully commanded so far, oldest first.
    pub fn commands(&self) -> Vec<ChargeType> {
        lock(&self.commands).clone()
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn set_charging(&self, charging: bool) {
        if let Some(line) = &self.charging {
            line.store(charging, Ordering::SeqCst);
        }
    }
}

impl Charger for SimCharger {
    fn name(&self) -> &str {
        &self.name
    }

    fn charge_type(&self) -> ChargeType {
        match &self.charging {
            Some(line) if line.load(Ordering::SeqCst) => ChargeType::Fast,
            Some(_) => ChargeType::None,
            None => ChargeType::Unknown,
        }
    }

    fn set_charge_type(&self, charge_type: ChargeType) -> Result<(), ChargerError> {
        let enable = self.enabled.as_ref().ok_or(ChargerError::Unsupported)?;
        enable.store(charge_type.is_charging(), Ordering::SeqCst);
        lock(&self.commands).push(charge_type);
        debug!(charger = %self.name, %charge_type, "charge type set");
        Ok(())
    }

    fn can_set_charge_type(&self) -> bool {
        self.enabled.is_some()
    }
}

const CHARGER_PROPERTIES: [Property; 2] = [Property::Online, Property::ChargeType];

impl PropertyProvider for SimCharger {
    fn properties(&self) -> &[Property] {
        &CHARGER_PROPERTIES
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue, PropertyError> {
        match property {
            Property::Online => Ok(PropertyValue::Bool(self.is_online())),
            Property::ChargeType => Ok(PropertyValue::ChargeType(self.charge_type())),
            other => Err(PropertyError::Unsupported(other)),
        }
    }

    fn set_property(&self, property: Property, value: PropertyValue) -> Result<(), PropertyError> {
        match (property, value) {
            (Property::ChargeType, PropertyValue::ChargeType(t)) => self
                .set_charge_type(t)
                .map_err(|_| PropertyError::ReadOnly(property)),
            (Property::ChargeType | Property::Online, _) => Err(PropertyError::ReadOnly(property)),
            (other, _) => Err(PropertyError::Unsupported(other)),
        }
    }
}

struct Registration {
    descriptor: SupplyDescriptor,
    provider: Arc<dyn PropertyProvider>,
    on_external_change: Arc<dyn Fn() + Send + Sync>,
}

#[derive(Default)]
struct Inner {
    supplies: HashMap<String, Registration>,
    chargers: HashMap<String, Arc<SimCharger>>,
}

/// In-memory power-supply registry.
///
/// `changed` notifications are broadcast by supply name; call
/// [`SimRegistry::subscribe`] to listen.
pub struct SimRegistry {
    inner: Mutex<Inner>,
    events: broadcast::Sender<String>,
}

impl Default for SimRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    pub fn add_charger(&self, charger: Arc<SimCharger>) {
        lock(&self.inner)
            .chargers
            .insert(charger.name().to_string(), charger);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        lock(&self.inner).supplies.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<SupplyDescriptor> {
        lock(&self.inner)
            .supplies
            .get(name)
            .map(|r| r.descriptor.clone())
    }

    /// Read a property the way a userspace listener would.
    pub fn get_property(
        &self,
        name: &str,
        property: Property,
    ) -> Option<Result<PropertyValue, PropertyError>> {
        let provider: Arc<dyn PropertyProvider> = {
            let inner = lock(&self.inner);
            match (inner.supplies.get(name), inner.chargers.get(name)) {
                (Some(reg), _) => reg.provider.clone(),
                (None, Some(charger)) => charger.clone(),
                (None, None) => return None,
            }
        };
        Some(provider.get_property(property))
    }

    /// Plug or unplug a charger's input.
    pub fn set_online(&self, charger: &str, online: bool) {
        let found = lock(&self.inner).chargers.get(charger).cloned();
        if let Some(c) = found {
            c.set_online(online);
            self.supply_changed(&c);
        }
    }

    /// Flip a charger's status line.
    pub fn set_charging(&self, charger: &str, charging: bool) {
        let found = lock(&self.inner).chargers.get(charger).cloned();
        if let Some(c) = found {
            c.set_charging(charging);
            self.supply_changed(&c);
        }
    }

    fn supply_changed(&self, charger: &SimCharger) {
        self.changed(charger.name());

        let callbacks: Vec<_> = {
            let inner = lock(&self.inner);
            charger
                .supplied_to()
                .iter()
                .filter_map(|name| inner.supplies.get(name))
                .map(|reg| reg.on_external_change.clone())
                .collect()
        };
        for callback in callbacks {
            callback();
        }
    }
}

impl SupplyRegistry for SimRegistry {
    fn register(
        &self,
        descriptor: SupplyDescriptor,
        provider: Arc<dyn PropertyProvider>,
        on_external_change: ExternalPowerCallback,
    ) -> Result<(), RegistryError> {
        let mut inner = lock(&self.inner);
        if inner.supplies.contains_key(&descriptor.name) {
            return Err(RegistryError::AlreadyRegistered(descriptor.name));
        }
        debug!(supply = %descriptor.name, kind = ?descriptor.kind, "supply registered");
        inner.supplies.insert(
            descriptor.name.clone(),
            Registration {
                descriptor,
                provider,
                on_external_change: Arc::from(on_external_change),
            },
        );
        Ok(())
    }

    fn unregister(&self, name: &str) {
        if lock(&self.inner).supplies.remove(name).is_some() {
            debug!(supply = %name, "supply unregistered");
        }
    }

    fn is_supplied(&self, name: &str) -> bool {
        lock(&self.inner)
            .chargers
            .values()
            .any(|c| c.is_online() && c.supplied_to().iter().any(|s| s == name))
    }

    fn changed(&self, name: &str) {
        trace!(supply = %name, "supply changed");
        let _ = self.events.send(name.to_string());
    }

    fn charger(&self, name: &str) -> Option<Arc<dyn Charger>> {
        lock(&self.inner)
            .chargers
            .get(name)
            .map(|c| c.clone() as Arc<dyn Charger>)
    }
}
