//! Derived view-model types produced from fetched sessions.
//!
//! None of these are persisted; they are rebuilt from scratch on every query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::types::{Application, Session};

/// Field-wise counter sums across a set of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTotal {
    pub bytes_tx: u64,
    pub bytes_rx: u64,
    pub pkt_tx: u64,
    pub pkt_rx: u64,
    pub pkt_tcp: u64,
    pub pkt_udp: u64,
}

impl SessionTotal {
    /// Counters saturate at `u64::MAX` instead of wrapping.
    pub fn add(mut self, s: &Session) -> Self {
        self.bytes_tx = self.bytes_tx.saturating_add(s.bytes_tx);
        self.bytes_rx = self.bytes_rx.saturating_add(s.bytes_rx);
        self.pkt_tx = self.pkt_tx.saturating_add(s.pkt_tx);
        self.pkt_rx = self.pkt_rx.saturating_add(s.pkt_rx);
        self.pkt_tcp = self.pkt_tcp.saturating_add(s.pkt_tcp);
        self.pkt_udp = self.pkt_udp.saturating_add(s.pkt_udp);
        self
    }

    pub fn pkt_total(&self) -> u64 {
        self.pkt_tx.saturating_add(self.pkt_rx)
    }
}

/// Quantity summed per bucket or per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// bytesTx + bytesRx
    Bytes,
    /// pktTx + pktRx
    Packets,
    /// pktTcp + pktUdp
    Protocol,
}

impl Metric {
    pub fn of(&self, s: &Session) -> u64 {
        match self {
            Metric::Bytes => s.bytes(),
            Metric::Packets => s.pkt_total(),
            Metric::Protocol => s.pkt_tcp.saturating_add(s.pkt_udp),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bytes" => Ok(Metric::Bytes),
            "packets" => Ok(Metric::Packets),
            "protocol" => Ok(Metric::Protocol),
            other => Err(format!(
                "unknown metric {:?}, expected bytes, packets or protocol",
                other
            )),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Bytes => "bytes",
            Metric::Packets => "packets",
            Metric::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Scalar session field read by the point-in-time sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleField {
    PktTcp,
    PktUdp,
    PktTotal,
    Bytes,
}

impl SampleField {
    pub fn of(&self, s: &Session) -> u64 {
        match self {
            SampleField::PktTcp => s.pkt_tcp,
            SampleField::PktUdp => s.pkt_udp,
            SampleField::PktTotal => s.pkt_total(),
            SampleField::Bytes => s.bytes(),
        }
    }
}

/// One application's values, positionally aligned with a label axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSeries {
    pub application: Application,
    pub values: Vec<u64>,
}

/// Per-application sum of a metric over the whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTotal {
    pub application: Application,
    pub value: u64,
}
