//! Results carried between the scan phases and out to the writers.

use std::net::IpAddr;

use chrono::{DateTime, Local};
use serde::Serialize;

/// A successful latency probe.
///
/// Failed probes never materialize as a value; the prober reports them as
/// `None`, which keeps latency-less records out of the ranking by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub addr: IpAddr,
    pub latency_ms: u64,
}

impl ProbeResult {
    /// Human-readable latency, e.g. `42ms`.
    pub fn latency_label(&self) -> String {
        format!("{}ms", self.latency_ms)
    }
}

/// A candidate that passed the download measurement.
///
/// Serialization intentionally emits only the address; the JSON exports and
/// the persisted address pool carry nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedResult {
    #[serde(rename = "address")]
    pub addr: IpAddr,
    #[serde(skip)]
    pub latency_ms: u64,
    #[serde(skip)]
    pub mbps: f64,
    #[serde(skip)]
    pub created_at: DateTime<Local>,
}

impl SpeedResult {
    pub fn latency_label(&self) -> String {
        format!("{}ms", self.latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_label_formats_milliseconds() {
        let probe = ProbeResult {
            addr: "1.1.1.1".parse().unwrap(),
            latency_ms: 42,
        };
        assert_eq!(probe.latency_label(), "42ms");
    }

    #[test]
    fn speed_result_serializes_address_only() {
        let result = SpeedResult {
            addr: "104.16.0.1".parse().unwrap(),
            latency_ms: 12,
            mbps: 88.5,
            created_at: Local::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "address": "104.16.0.1" }));
    }
}
