use std::sync::Arc;
use std::time::Duration;

use adcbatt_gauge::BatteryMonitor;
use adcbatt_platform::linux::{IioAdc, SysfsRegistry};
use color_eyre::eyre::{bail, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::cli::WatchArgs;
use crate::config::UserConfig;

pub async fn run(config: UserConfig, args: WatchArgs) -> Result<()> {
    let watch = &config.watch;
    let registry = Arc::new(SysfsRegistry::new(&watch.power_supply_path));
    if !registry.is_supported() {
        bail!(
            "no power supply class at {}",
            watch.power_supply_path.display()
        );
    }

    let device = args.device.as_deref().unwrap_or(&watch.iio_device);
    let adc = Arc::new(IioAdc::find(device)?);
    info!(device, path = ?adc.device(), "using IIO device");

    // Record the initial plug state so the first poll does not count as a change.
    registry.poll_external();
    let monitor = BatteryMonitor::attach(&config.battery, adc, registry.clone())?;

    let interval = args
        .interval
        .unwrap_or(Duration::from_millis(watch.interval_ms));
    let mut ticker = tokio::time::interval(interval);
    let mut counter = 0u32;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        if registry.poll_external() {
            tokio::task::yield_now().await;
        }

        let snapshot = monitor.snapshot();
        let doc = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "battery": monitor.name(),
            "capacity_percent": snapshot.capacity_percent(),
            "status_label": snapshot.status.label(),
            "poll_interval": humantime::format_duration(snapshot.poll_interval).to_string(),
            "snapshot": snapshot,
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
