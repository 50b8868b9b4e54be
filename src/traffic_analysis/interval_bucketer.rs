//! Bar-chart style bucketing of sessions into intervals.
//!
//! Labels are data-driven: the earliest session opens the first bucket and a
//! new bucket opens only when a session starts at least `width` after the
//! previous label. Silent periods therefore produce no buckets, and every
//! bucket `[label_i, label_{i+1})` spans less than `width` of actual data.
//! This is intentionally not a calendar-aligned grid.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::storage::types::{AppSession, Timestamp};

use super::types::{ApplicationSeries, Metric};
use super::units::ByteUnit;

/// Bucket widths offered on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BucketInterval {
    #[default]
    TenMinutes,
    ThirtyMinutes,
    OneHour,
    TwelveHours,
    TwentyFourHours,
}

impl BucketInterval {
    pub fn width(&self) -> Duration {
        match self {
            BucketInterval::TenMinutes => Duration::minutes(10),
            BucketInterval::ThirtyMinutes => Duration::minutes(30),
            BucketInterval::OneHour => Duration::hours(1),
            BucketInterval::TwelveHours => Duration::hours(12),
            BucketInterval::TwentyFourHours => Duration::hours(24),
        }
    }
}

impl fmt::Display for BucketInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketInterval::TenMinutes => "10m",
            BucketInterval::ThirtyMinutes => "30m",
            BucketInterval::OneHour => "1h",
            BucketInterval::TwelveHours => "12h",
            BucketInterval::TwentyFourHours => "24h",
        };
        f.write_str(name)
    }
}

impl FromStr for BucketInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "10m" | "10min" | "10 min" => Ok(BucketInterval::TenMinutes),
            "30m" | "30min" | "30 min" => Ok(BucketInterval::ThirtyMinutes),
            "1h" | "1 hour" => Ok(BucketInterval::OneHour),
            "12h" | "12 hours" => Ok(BucketInterval::TwelveHours),
            "24h" | "24 hours" => Ok(BucketInterval::TwentyFourHours),
            other => Err(format!(
                "unknown interval {:?}, expected 10m, 30m, 1h, 12h or 24h",
                other
            )),
        }
    }
}

/// Chart-ready bucket sums. Every series has one value per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSeries {
    pub labels: Vec<Timestamp>,
    pub metric: Metric,
    pub series: Vec<ApplicationSeries>,
}

impl IntervalSeries {
    pub fn get(&self, name: &str) -> Option<&[u64]> {
        self.series
            .iter()
            .find(|s| s.application.name == name)
            .map(|s| s.values.as_slice())
    }

    /// Values rescaled to `unit`, leaving the raw sums untouched. Only
    /// meaningful for `Metric::Bytes`; other metrics are returned as-is.
    pub fn in_unit(&self, unit: ByteUnit) -> Vec<Vec<f64>> {
        let unit = if self.metric == Metric::Bytes { unit } else { ByteUnit::B };
        self.series
            .iter()
            .map(|s| s.values.iter().map(|v| unit.convert(*v)).collect())
            .collect()
    }
}

/// Opens a label at the earliest start, then at every start that is at
/// least `width_ms` past the previous label.
fn labels(groups: &[AppSession], width_ms: i64) -> Vec<Timestamp> {
    // Groups are each sorted already; merge them into one ordered stream.
    let mut starts: Vec<Timestamp> = groups
        .iter()
        .flat_map(|g| g.sessions.iter().map(|s| s.start))
        .collect();
    starts.sort_unstable();

    let mut labels: Vec<Timestamp> = Vec::new();
    for start in starts {
        match labels.last() {
            Some(last) if start.saturating_sub(*last) < width_ms => {}
            _ => labels.push(start),
        }
    }
    labels
}

/// Partition sessions into left-closed buckets of `width` and sum `metric`
/// per application per bucket. A non-positive width is treated as 1 ms.
pub fn bucket(groups: &[AppSession], width: Duration, metric: Metric) -> IntervalSeries {
    let width_ms = width.num_milliseconds().max(1);
    let labels = labels(groups, width_ms);

    let series = groups
        .iter()
        .map(|group| {
            let mut values = vec![0u64; labels.len()];
            for s in &group.sessions {
                // Greatest label <= start; always exists since labels[0] is the minimum start.
                let idx = labels.partition_point(|label| *label <= s.start);
                if let Some(slot) = idx.checked_sub(1).and_then(|i| values.get_mut(i)) {
                    *slot = slot.saturating_add(metric.of(s));
                }
            }
            ApplicationSeries {
                application: group.application.clone(),
                values,
            }
        })
        .collect();

    IntervalSeries {
        labels,
        metric,
        series,
    }
}
