use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::charger::{Charger, ChargerError};
use crate::supply::{
    ExternalPowerCallback, PropertyProvider, RegistryError, SupplyDescriptor, SupplyRegistry,
};
use crate::types::ChargeType;

pub const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

const EVENT_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Charger backed by `/sys/class/power_supply/<name>`.
#[derive(Debug, Clone)]
pub struct SysfsCharger {
    name: String,
    path: PathBuf,
}

impl SysfsCharger {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    fn charge_type_path(&self) -> PathBuf {
        self.path.join("charge_type")
    }
}

impl Charger for SysfsCharger {
    fn name(&self) -> &str {
        &self.name
    }

    fn charge_type(&self) -> ChargeType {
        fs::read_to_string(self.charge_type_path())
            .map(|v| ChargeType::from_sysfs(&v))
            .unwrap_or(ChargeType::Unknown)
    }

    fn set_charge_type(&self, charge_type: ChargeType) -> Result<(), ChargerError> {
        if !self.can_set_charge_type() {
            return Err(ChargerError::Unsupported);
        }
        fs::write(self.charge_type_path(), charge_type.as_sysfs())
            .map_err(|e| ChargerError::Io(e.to_string()))
    }

    fn can_set_charge_type(&self) -> bool {
        fs::metadata(self.charge_type_path())
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }
}

#[derive(Default)]
struct Inner {
    /// External power callbacks by supply name. Properties are read from
    /// sysfs, so providers are not kept.
    supplies: HashMap<String, Arc<dyn Fn() + Send + Sync>>,
    last_online: Option<bool>,
}

/// Registry view over the kernel power-supply class.
///
/// sysfs does not expose `supplied_to`, so every battery is considered fed
/// whenever any mains or USB supply is online. There is no event source
/// either: call [`SysfsRegistry::poll_external`] periodically and it fires
/// the registered callbacks when that answer flips.
pub struct SysfsRegistry {
    root: PathBuf,
    inner: Mutex<Inner>,
    events: broadcast::Sender<String>,
}

impl Default for SysfsRegistry {
    fn default() -> Self {
        Self::new(POWER_SUPPLY_PATH)
    }
}

impl SysfsRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            root: root.into(),
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.root.exists()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Re-check external power and fire callbacks if it changed.
    ///
    /// Returns true when a change was detected. The first call only records
    /// the initial state.
    pub fn poll_external(&self) -> bool {
        let online = external_online(&self.root);

        let callbacks: Vec<_> = {
            let mut inner = lock(&self.inner);
            let previous = inner.last_online.replace(online);
            if previous.is_none() || previous == Some(online) {
                return false;
            }
            inner.supplies.values().cloned().collect()
        };

        info!(online, "external power changed");
        for callback in callbacks {
            callback();
        }
        true
    }
}

impl SupplyRegistry for SysfsRegistry {
    fn register(
        &self,
        descriptor: SupplyDescriptor,
        _provider: Arc<dyn PropertyProvider>,
        on_external_change: ExternalPowerCallback,
    ) -> Result<(), RegistryError> {
        let mut inner = lock(&self.inner);
        if inner.supplies.contains_key(&descriptor.name) {
            return Err(RegistryError::AlreadyRegistered(descriptor.name));
        }
        debug!(supply = %descriptor.name, "supply registered");
        inner.supplies.insert(
            descriptor.name,
            Arc::from(on_external_change),
        );
        Ok(())
    }

    fn unregister(&self, name: &str) {
        lock(&self.inner).supplies.remove(name);
    }

    fn is_supplied(&self, _name: &str) -> bool {
        external_online(&self.root)
    }

    fn changed(&self, name: &str) {
        trace!(supply = %name, "supply changed");
        let _ = self.events.send(name.to_string());
    }

    fn charger(&self, name: &str) -> Option<Arc<dyn Charger>> {
        let path = self.root.join(name);
        if !path.exists() {
            warn!(charger = %name, path = ?path, "charger not found");
            return None;
        }
        Some(Arc::new(SysfsCharger::new(name, path)))
    }
}

fn external_online(root: &Path) -> bool {
    if !root.exists() {
        return false;
    }

    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            let type_path = path.join("type");
            if let Ok(type_content) = fs::read_to_string(&type_path) {
                if matches!(type_content.trim(), "Mains" | "USB") {
                    let online_path = path.join("online");
                    if let Ok(online) = fs::read_to_string(online_path) {
                        if online.trim() == "1" {
                            return true;
                        }
                    }
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::{Property, PropertyError, PropertyValue, SupplyKind};

    struct Nothing;

    impl PropertyProvider for Nothing {
        fn properties(&self) -> &[Property] {
            &[]
        }

        fn get_property(&self, property: Property) -> Result<PropertyValue, PropertyError> {
            Err(PropertyError::Unsupported(property))
        }
    }

    fn scratch_root(tag: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("adcbatt-psy-{}-{}", std::process::id(), tag));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn add_supply(root: &Path, name: &str, kind: &str, online: bool) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("type"), format!("{}\n", kind)).unwrap();
        fs::write(dir.join("online"), if online { "1\n" } else { "0\n" }).unwrap();
        dir
    }

    #[test]
    fn test_is_supplied_checks_mains_and_usb() {
        let root = scratch_root("supplied");
        let registry = SysfsRegistry::new(&root);
        assert!(!registry.is_supplied("battery"));

        add_supply(&root, "usb", "USB", false);
        assert!(!registry.is_supplied("battery"));

        add_supply(&root, "ac", "Mains", true);
        assert!(registry.is_supplied("battery"));
    }

    #[test]
    fn test_poll_external_fires_callbacks_on_change() {
        let root = scratch_root("poll");
        let ac = add_supply(&root, "ac", "Mains", false);
        let registry = SysfsRegistry::new(&root);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry
            .register(
                SupplyDescriptor {
                    name: "battery".to_string(),
                    kind: SupplyKind::Battery,
                    properties: Vec::new(),
                    use_for_apm: false,
                },
                Arc::new(Nothing),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(!registry.poll_external());
        fs::write(ac.join("online"), "1\n").unwrap();
        assert!(registry.poll_external());
        assert!(!registry.poll_external());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sysfs_charger_reads_and_writes_charge_type() {
        let root = scratch_root("charger");
        let dir = add_supply(&root, "gpio-charger", "Mains", true);
        fs::write(dir.join("charge_type"), "Fast\n").unwrap();

        let registry = SysfsRegistry::new(&root);
        let charger = registry.charger("gpio-charger").unwrap();
        assert_eq!(charger.charge_type(), ChargeType::Fast);

        charger.set_charge_type(ChargeType::None).unwrap();
        assert_eq!(charger.charge_type(), ChargeType::None);
        assert!(registry.charger("missing").is_none());
    }
}
