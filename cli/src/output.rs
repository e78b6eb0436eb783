//! Result writers: a CSV report, a JSON address list, and the append-merge
//! into the persisted address pool.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use edgescan_common::network::outcome::SpeedResult;
use tracing::warn;

use crate::input::PoolEntry;

/// Full report, one row per result. Starts with a UTF-8 BOM so spreadsheet
/// apps pick the right encoding.
pub fn write_csv(path: &Path, results: &[SpeedResult]) -> anyhow::Result<()> {
    let mut out = String::from("\u{feff}");
    out.push_str("address,latency,speed_mbps,tested_at\n");
    for result in results {
        let _ = writeln!(
            out,
            "{},{},{:.2},{}",
            result.addr,
            result.latency_label(),
            result.mbps,
            result.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    std::fs::write(path, out).with_context(|| format!("cannot write {}", path.display()))
}

/// Address-only JSON array, the format the input reader and the pool file
/// share.
pub fn write_json(path: &Path, results: &[SpeedResult]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
}

/// Merges the result addresses into the pool file, keeping existing entries
/// and skipping duplicates. Returns how many addresses were actually added.
pub fn append_pool(path: &Path, results: &[SpeedResult]) -> anyhow::Result<usize> {
    let mut entries: Vec<PoolEntry> = match std::fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => match serde_json::from_str(&existing) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("pool file {} is not a JSON address list ({err}), starting fresh", path.display());
                Vec::new()
            }
        },
        _ => Vec::new(),
    };

    let mut added = 0;
    for result in results {
        let address = result.addr.to_string();
        if !entries.iter().any(|entry| entry.address == address) {
            entries.push(PoolEntry { address });
            added += 1;
        }
    }

    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(added)
}
