//! Overpass query construction and response parsing.
//!
//! Two ways of tagging TMC points exist in OpenStreetMap; each gets a
//! strategy pairing a query builder with a parser. Which one a country uses
//! is detected once and memoized by the resolver.

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{LocationStatus, ResolvedLocation};

/// Public Overpass API endpoints, rotated on failure.
pub const ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.private.coffee/api/interpreter",
];

/// Hard abort for a single request.
pub const REQUEST_TIMEOUT_MS: u64 = 20_000;
/// Retries beyond the initial attempt.
pub const MAX_RETRIES: usize = 2;
/// Backoff slope: attempt `n` sleeps `n * RETRY_BACKOFF_MS` before issuing.
pub const RETRY_BACKOFF_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub center: Option<Center>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A closed pair of (query builder, parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Nodes tagged `TMC:cid_{cid}:tabcd_{tabcd}:LocationCode`.
    NodeTags,
    /// Relations of `type=tmc:point` with `table` and `lcd` tags.
    PointRelations,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::NodeTags, Strategy::PointRelations];

    pub fn build_query(&self, batch: &[u32], cid: u16, tabcd: u16) -> String {
        let alternation = batch
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("|");
        match self {
            Strategy::NodeTags => format!(
                "[out:json][timeout:20];\
                 node[\"TMC:cid_{cid}:tabcd_{tabcd}:LocationCode\"~\"^({alternation})$\"];\
                 out body;"
            ),
            Strategy::PointRelations => format!(
                "[out:json][timeout:20];\
                 relation[\"type\"=\"tmc:point\"][\"table\"=\"{cid}:{tabcd}\"]\
                 [\"lcd\"~\"^({alternation})$\"];\
                 out center;"
            ),
        }
    }

    pub fn parse(&self, elements: &[OverpassElement], cid: u16, tabcd: u16) -> Vec<ResolvedLocation> {
        match self {
            Strategy::NodeTags => {
                let prefix = format!("TMC:cid_{cid}:tabcd_{tabcd}");
                let lcd_key = format!("{prefix}:LocationCode");
                let prev_key = format!("{prefix}:PrevLocationCode");
                let next_key = format!("{prefix}:NextLocationCode");
                elements
                    .iter()
                    .filter_map(|el| {
                        let lcd = el.tags.get(&lcd_key)?.parse().ok()?;
                        Some(ResolvedLocation {
                            lcd,
                            lat: el.lat?,
                            lon: el.lon?,
                            name: non_empty(el.tags.get("name")),
                            road_ref: non_empty(el.tags.get("ref")),
                            prev_lcd: linked(el.tags.get(&prev_key)),
                            next_lcd: linked(el.tags.get(&next_key)),
                            status: LocationStatus::Resolved,
                        })
                    })
                    .collect()
            }
            Strategy::PointRelations => elements
                .iter()
                .filter_map(|el| {
                    let lcd = el.tags.get("lcd")?.parse().ok()?;
                    let center = el.center.as_ref()?;
                    Some(ResolvedLocation {
                        lcd,
                        lat: center.lat,
                        lon: center.lon,
                        name: non_empty(el.tags.get("name")),
                        road_ref: non_empty(el.tags.get("road_ref")).or_else(|| non_empty(el.tags.get("ref"))),
                        prev_lcd: linked(el.tags.get("prev_lcd")),
                        next_lcd: linked(el.tags.get("next_lcd")),
                        status: LocationStatus::Resolved,
                    })
                })
                .collect(),
        }
    }
}

fn non_empty(tag: Option<&String>) -> Option<String> {
    tag.filter(|s| !s.is_empty()).cloned()
}

fn linked(tag: Option<&String>) -> Option<u32> {
    tag.and_then(|s| s.parse().ok()).filter(|&v| v != 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
