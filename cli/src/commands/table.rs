use adcbatt_gauge::{LookupRange, LookupTable};
use color_eyre::eyre::Result;
use serde_json::{json, Value};

use crate::config::UserConfig;

pub fn run(config: &UserConfig, voltages: &[i32], json: bool) -> Result<()> {
    config.battery.validate()?;
    let table = LookupTable::new(&config.battery.thresholds)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&table, voltages))?);
        return Ok(());
    }

    println!(
        "{:>11}  {:>11}  {:>9}  {:>7}",
        "start (mV)", "end (mV)", "base", "delta"
    );
    for range in table.ranges() {
        println!(
            "{:>11}  {:>11}  {:>9}  {:>7}",
            range.start,
            end_label(range),
            format_milli_percent(range.base),
            range.delta
        );
    }

    if !voltages.is_empty() {
        println!();
        for &voltage in voltages {
            println!(
                "{:>6} mV -> {}",
                voltage,
                format_milli_percent(table.percentage_for(voltage))
            );
        }
    }

    Ok(())
}

fn to_json(table: &LookupTable, voltages: &[i32]) -> Value {
    let ranges: Vec<_> = table
        .ranges()
        .iter()
        .map(|r| {
            json!({
                "start": r.start,
                "end": r.end,
                "base": r.base,
                "delta": r.delta,
            })
        })
        .collect();

    let lookups: Vec<_> = voltages
        .iter()
        .map(|&v| json!({ "voltage": v, "charge_now": table.percentage_for(v) }))
        .collect();

    json!({ "ranges": ranges, "lookups": lookups })
}

fn end_label(range: &LookupRange) -> String {
    if range.end == i32::MAX {
        "max".to_string()
    } else {
        range.end.to_string()
    }
}

fn format_milli_percent(value: i32) -> String {
    format!("{}.{:03}%", value / 1000, (value % 1000).abs())
}

#[cfg(test)]
mod tests {
    use adcbatt_gauge::Threshold;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_format_milli_percent() {
        assert_eq!(format_milli_percent(25_000), "25.000%");
        assert_eq!(format_milli_percent(33 * 299), "9.867%");
        assert_eq!(format_milli_percent(100_000), "100.000%");
    }

    #[test]
    fn test_json_document() {
        let table = LookupTable::new(&[Threshold::new(3400, 0), Threshold::new(4200, 100)]).unwrap();
        let doc = to_json(&table, &[3800]);
        assert_eq!(doc["ranges"].as_array().map(Vec::len), Some(3));
        assert_eq!(doc["ranges"][1]["delta"], 125);
        assert_eq!(doc["lookups"][0]["charge_now"], 50_000);
    }
}
