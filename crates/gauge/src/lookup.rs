//! Piecewise-linear voltage to charge lookup.
//!
//! Charge is reported in milli-percent (0..=100_000) so the interpolation
//! keeps sub-percent precision with integer arithmetic.

use crate::config::Threshold;
use crate::error::{GaugeError, Result};

pub const FULL_MILLI_PERCENT: i32 = 100_000;

/// One linear segment of the table: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRange {
    pub start: i32,
    pub end: i32,
    pub base: i32,
    /// Milli-percent gained per voltage unit inside the range.
    pub delta: i32,
}

impl LookupRange {
    fn sentinel(start: i32, end: i32, base: i32) -> Self {
        Self {
            start,
            end,
            base,
            delta: 0,
        }
    }

    fn between(low: Threshold, high: Threshold) -> Self {
        let volts = i64::from(high.voltage) - i64::from(low.voltage);
        let percents = i64::from(high.percent) - i64::from(low.percent);
        Self {
            start: low.voltage,
            end: high.voltage,
            base: 1000 * i32::from(low.percent),
            delta: (1000 * percents / volts) as i32,
        }
    }

    fn interpolate(&self, voltage: i32) -> i32 {
        let offset = i64::from(voltage) - i64::from(self.start);
        (i64::from(self.base) + offset * i64::from(self.delta)) as i32
    }
}

/// Searchable set of ranges covering every `i32` voltage exactly once.
///
/// The first range is the bottom sentinel (0 %) and the last is the top
/// sentinel (100 %); in between there is one range per adjacent pair of
/// thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    ranges: Vec<LookupRange>,
}

impl LookupTable {
    pub fn new(thresholds: &[Threshold]) -> Result<Self> {
        validate(thresholds)?;

        let mut ranges = Vec::new();
        ranges.try_reserve_exact(thresholds.len() + 1)?;

        ranges.push(LookupRange::sentinel(0, thresholds[0].voltage, 0));
        ranges.extend(
            thresholds
                .windows(2)
                .map(|pair| LookupRange::between(pair[0], pair[1])),
        );
        let last = thresholds[thresholds.len() - 1];
        ranges.push(LookupRange::sentinel(
            last.voltage,
            i32::MAX,
            FULL_MILLI_PERCENT,
        ));

        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[LookupRange] {
        &self.ranges
    }

    /// Charge in milli-percent for a voltage.
    pub fn percentage_for(&self, voltage: i32) -> i32 {
        self.ranges[self.range_index(voltage)].interpolate(voltage)
    }

    /// Index of the range holding `voltage`.
    ///
    /// Binary search over the closed index interval `[lo, hi]`. The bottom
    /// sentinel also takes everything below its start and the top sentinel
    /// everything from its end up, which makes the search total.
    fn range_index(&self, voltage: i32) -> usize {
        let last = self.ranges.len() - 1;
        let (mut lo, mut hi) = (0, last);

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let range = &self.ranges[mid];
            if mid > 0 && voltage < range.start {
                hi = mid - 1;
            } else if mid < last && voltage >= range.end {
                lo = mid + 1;
            } else {
                return mid;
            }
        }
        lo
    }
}

fn validate(thresholds: &[Threshold]) -> Result<()> {
    let Some(first) = thresholds.first() else {
        return Err(GaugeError::Configuration(
            "at least one calibration threshold is required".to_string(),
        ));
    };
    if first.voltage < 0 {
        return Err(GaugeError::Configuration(format!(
            "threshold voltage {} is negative",
            first.voltage
        )));
    }
    if let Some(t) = thresholds.iter().find(|t| t.percent > 100) {
        return Err(GaugeError::Configuration(format!(
            "threshold at {} has percent {} above 100",
            t.voltage, t.percent
        )));
    }
    for pair in thresholds.windows(2) {
        if pair[1].voltage <= pair[0].voltage {
            return Err(GaugeError::Configuration(format!(
                "threshold voltages must be strictly increasing ({} then {})",
                pair[0].voltage, pair[1].voltage
            )));
        }
        if pair[1].percent < pair[0].percent {
            return Err(GaugeError::Configuration(format!(
                "threshold percents must not decrease ({}% at {} then {}% at {})",
                pair[0].percent, pair[0].voltage, pair[1].percent, pair[1].voltage
            )));
        }
    }
    Ok(())
}
