//! Alternative Frequency accumulation and Method-A/Method-B disambiguation.
//!
//! Method A is a flat list; Method B groups frequencies per transmitter,
//! announced as a header (`225 + count`, transmitter frequency) followed by
//! pairs that each contain the transmitter's own frequency. Since the header
//! encoding is shared, the method is inferred from how the per-transmitter
//! sets fill up and how often pairs reference their header frequency.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::Freq;

/// A per-transmitter set counts as plausibly full at this fraction of the
/// announced count.
pub const PLAUSIBLY_FULL_RATIO: f64 = 0.75;
/// Minimum fraction of pairs that must reference the header frequency for a
/// single plausible group to indicate Method B.
pub const MATCH_RATIO: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AfMethod {
    Unknown,
    MethodA,
    MethodB,
}

/// State of one announced transmitter group (Method B candidate).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BGroupEntry {
    pub expected: u8,
    pub afs: BTreeSet<Freq>,
    pub match_count: u32,
    pub pair_count: u32,
}

impl BGroupEntry {
    fn plausibly_full(&self) -> bool {
        let size = self.afs.len();
        size as f64 >= PLAUSIBLY_FULL_RATIO * self.expected as f64
            || (self.expected <= 2 && size == self.expected as usize)
            || (self.expected > 5 && size > 4)
    }
}

#[derive(Debug, Clone)]
pub struct AfEngine {
    /// Ordered unique list of every decoded AF.
    pub list: Vec<Freq>,
    /// First frequency announced as a header, kept at the front of `list`.
    pub head: Option<Freq>,
    pub b_map: BTreeMap<Freq, BGroupEntry>,
    pub method: AfMethod,
    current_b_group: Option<Freq>,
    last_pair: Option<u16>,
}

impl AfEngine {
    pub fn new() -> Self {
        AfEngine {
            list: Vec::new(),
            head: None,
            b_map: BTreeMap::new(),
            method: AfMethod::Unknown,
            current_b_group: None,
            last_pair: None,
        }
    }

    /// Feed the AF byte pair of a 0A group (block 3). Repeats of the same
    /// block value are ignored to avoid double-counting.
    pub fn update(&mut self, b3: u16) {
        if self.last_pair == Some(b3) {
            return;
        }
        self.last_pair = Some(b3);

        let af1 = (b3 >> 8) as u8;
        let af2 = (b3 & 0xFF) as u8;

        if (225..=249).contains(&af1) {
            if let Some(h) = Freq::from_af_code(af2) {
                self.insert_front(h);
                self.head = Some(h);
                let entry = self.b_map.entry(h).or_default();
                entry.expected = af1 - 224;
                self.current_b_group = Some(h);
            }
        } else {
            let f1 = Freq::from_af_code(af1);
            let f2 = Freq::from_af_code(af2);
            for f in [f1, f2].into_iter().flatten() {
                self.insert(f);
            }
            if let (Some(a), Some(b)) = (f1, f2) {
                if let Some(h) = self.current_b_group {
                    let entry = self.b_map.entry(h).or_default();
                    entry.afs.insert(a);
                    entry.afs.insert(b);
                    entry.pair_count += 1;
                    if a == h || b == h {
                        entry.match_count += 1;
                    }
                }
            }
        }

        self.reclassify();
    }

    fn insert(&mut self, f: Freq) {
        if !self.list.contains(&f) {
            self.list.push(f);
        }
    }

    fn insert_front(&mut self, f: Freq) {
        self.list.retain(|&x| x != f);
        self.list.insert(0, f);
    }

    fn reclassify(&mut self) {
        let full: Vec<&BGroupEntry> = self
            .b_map
            .values()
            .filter(|e| e.plausibly_full())
            .collect();

        self.method = match full.len() {
            0 => AfMethod::MethodA,
            1 => {
                let e = full[0];
                if e.pair_count > 0 && e.match_count as f64 / e.pair_count as f64 > MATCH_RATIO {
                    AfMethod::MethodB
                } else {
                    AfMethod::MethodA
                }
            }
            _ => AfMethod::MethodB,
        };
    }
}

impl Default for AfEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
