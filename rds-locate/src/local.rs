//! Local TMC location tables.
//!
//! A country table lives at `tmc/{cid}_{tabcd}.json` under the resolver's
//! data directory: a JSON object mapping stringified LCDs to
//! `[lat, lon, name, prev_lcd, next_lcd]`, with 0 denoting absent linkage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{LocationStatus, ResolvedLocation, Result};

#[derive(Debug, Deserialize)]
struct LocalEntry(f64, f64, String, u32, u32);

/// Path of the table for a `(cid, tabcd)` pair.
pub fn table_path(data_dir: &Path, cid: u16, tabcd: u16) -> PathBuf {
    data_dir.join("tmc").join(format!("{cid}_{tabcd}.json"))
}

/// Load and parse one country table. Errors cover both a missing file and a
/// corrupt one; the caller treats either as local-unavailable.
pub async fn load_table(
    data_dir: &Path,
    cid: u16,
    tabcd: u16,
) -> Result<HashMap<u32, ResolvedLocation>> {
    let text = tokio::fs::read_to_string(table_path(data_dir, cid, tabcd)).await?;
    let raw: HashMap<String, LocalEntry> = serde_json::from_str(&text)?;

    let mut table = HashMap::with_capacity(raw.len());
    for (key, entry) in raw {
        let lcd: u32 = match key.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        table.insert(
            lcd,
            ResolvedLocation {
                lcd,
                lat: entry.0,
                lon: entry.1,
                name: (!entry.2.is_empty()).then_some(entry.2),
                road_ref: None,
                prev_lcd: (entry.3 != 0).then_some(entry.3),
                next_lcd: (entry.4 != 0).then_some(entry.4),
                status: LocationStatus::Resolved,
            },
        );
    }
    Ok(table)
}
