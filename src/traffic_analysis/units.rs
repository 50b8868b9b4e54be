use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Decimal byte units (powers of 1000), bytes not bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ByteUnit {
    #[default]
    B,
    KB,
    MB,
    GB,
    TB,
}

impl ByteUnit {
    pub const ALL: [ByteUnit; 5] = [ByteUnit::B, ByteUnit::KB, ByteUnit::MB, ByteUnit::GB, ByteUnit::TB];

    pub fn scale(&self) -> f64 {
        match self {
            ByteUnit::B => 1.0,
            ByteUnit::KB => 1e3,
            ByteUnit::MB => 1e6,
            ByteUnit::GB => 1e9,
            ByteUnit::TB => 1e12,
        }
    }

    pub fn convert(&self, bytes: u64) -> f64 {
        bytes as f64 / self.scale()
    }

    /// Largest unit in which `bytes` is still at least 1.
    pub fn fitting(bytes: f64) -> ByteUnit {
        ByteUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|unit| bytes >= unit.scale())
            .unwrap_or(ByteUnit::B)
    }
}

impl fmt::Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ByteUnit::B => "B",
            ByteUnit::KB => "KB",
            ByteUnit::MB => "MB",
            ByteUnit::GB => "GB",
            ByteUnit::TB => "TB",
        };
        f.write_str(name)
    }
}

impl FromStr for ByteUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ByteUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown unit {:?}, expected one of B, KB, MB, GB, TB", s))
    }
}

/// `1.5 KB` style rendering with one decimal.
pub fn human(bytes: u64) -> String {
    let unit = ByteUnit::fitting(bytes as f64);
    format!("{:.1} {}", unit.convert(bytes), unit)
}

/// Throughput over `seconds`, e.g. 10000 bytes over 10 s is `1.0 KB/s`.
pub fn human_rate(bytes: u64, seconds: u64) -> String {
    let per_sec = bytes as f64 / seconds.max(1) as f64;
    let unit = ByteUnit::fitting(per_sec);
    format!("{:.1} {}/s", per_sec / unit.scale(), unit)
}
