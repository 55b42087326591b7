//! Per-station mutable state.
//!
//! Every field here is scoped to the currently confirmed PI; a confirmed PI
//! change replaces the whole struct with a fresh one (deep reset). Fragment
//! buffers are fixed-size with explicit write masks rather than sparse
//! strings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::af::AfEngine;
use crate::decode::{ClockTime, ProgramItem, PsSegment, RtSegment};
use crate::eon::EonTable;
use crate::rtplus::{OdaRegistry, RtPlusState};
use crate::tmc::TmcEngine;
use crate::types::{format_hms, pi_to_string};

pub const HISTORY_CAP: usize = 200;
pub const SEQUENCE_CAP: usize = 3000;
pub const SEQUENCE_TRIM: usize = 1000;

/// Histories start only once the station has settled after PI confirmation.
const PI_SETTLE_MS: u64 = 3000;
const PS_STABLE_MS: u64 = 1000;
const RT_STABLE_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PsHistoryEntry {
    pub time: String,
    pub pi: String,
    pub ps: String,
    pub pty: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtHistoryEntry {
    pub time: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct StationState {
    pub pi: Option<u16>,
    pub pi_established_ms: u64,

    pub ps_buf: [char; 8],
    pub ps_mask: [bool; 8],
    rt_bufs: [[char; 64]; 2],
    rt_masks: [[bool; 64]; 2],
    pub rt_ab: bool,
    pub lps_buf: [char; 32],
    pub ptyn_buf: [char; 8],

    pub tp: bool,
    pub ta: bool,
    pub ms: bool,
    pub di_dynamic_pty: bool,
    pub di_compressed: bool,
    pub di_artificial_head: bool,
    pub di_stereo: bool,

    pub pty: u8,
    pub pin: Option<ProgramItem>,
    pub ecc: Option<String>,
    pub lic: Option<String>,
    pub tmc_id: Option<u16>,
    pub clock: Option<ClockTime>,

    pub af: AfEngine,
    pub tmc: TmcEngine,
    pub eon: EonTable,
    pub oda: OdaRegistry,
    pub rt_plus: RtPlusState,

    pub group_counts: BTreeMap<String, u64>,
    pub group_total: u64,
    pub group_sequence: Vec<String>,

    ps_candidate: String,
    ps_stable_since: u64,
    rt_candidate: String,
    rt_stable_since: u64,
    pub ps_history: Vec<PsHistoryEntry>,
    pub rt_history: Vec<RtHistoryEntry>,
}

impl StationState {
    /// The initial (and post-reset) image of a station.
    pub fn new() -> Self {
        StationState {
            pi: None,
            pi_established_ms: 0,
            ps_buf: [' '; 8],
            ps_mask: [false; 8],
            rt_bufs: [[' '; 64]; 2],
            rt_masks: [[false; 64]; 2],
            rt_ab: false,
            lps_buf: [' '; 32],
            ptyn_buf: [' '; 8],
            tp: false,
            ta: false,
            ms: false,
            di_dynamic_pty: false,
            di_compressed: false,
            di_artificial_head: false,
            di_stereo: false,
            pty: 0,
            pin: None,
            ecc: None,
            lic: None,
            tmc_id: None,
            clock: None,
            af: AfEngine::new(),
            tmc: TmcEngine::new(),
            eon: EonTable::new(),
            oda: OdaRegistry::new(),
            rt_plus: RtPlusState::new(),
            group_counts: BTreeMap::new(),
            group_total: 0,
            group_sequence: Vec::new(),
            ps_candidate: " ".repeat(8),
            ps_stable_since: 0,
            rt_candidate: String::new(),
            rt_stable_since: 0,
            ps_history: Vec::new(),
            rt_history: Vec::new(),
        }
    }

    // -- fragment writes ----------------------------------------------------

    pub fn apply_ps(&mut self, seg: &PsSegment) {
        self.ta = seg.ta;
        self.ms = seg.ms;
        match seg.address {
            0 => self.di_dynamic_pty = seg.di_bit,
            1 => self.di_compressed = seg.di_bit,
            2 => self.di_artificial_head = seg.di_bit,
            3 => self.di_stereo = seg.di_bit,
            _ => {}
        }
        for (i, &c) in seg.chars.iter().enumerate() {
            let pos = 2 * seg.address + i;
            if pos < 8 {
                self.ps_buf[pos] = c;
                self.ps_mask[pos] = true;
            }
        }
    }

    pub fn apply_rt(&mut self, seg: &RtSegment) {
        if seg.ab_flag != self.rt_ab {
            self.rt_ab = seg.ab_flag;
            let idx = self.active_rt();
            self.rt_bufs[idx] = [' '; 64];
            self.rt_masks[idx] = [false; 64];
            self.rt_plus.mark_stale();
        }
        let idx = self.active_rt();
        let stride = seg.chars.len();
        for (i, &c) in seg.chars.iter().enumerate() {
            let pos = stride * seg.address + i;
            if pos < 64 {
                self.rt_bufs[idx][pos] = c;
                self.rt_masks[idx][pos] = true;
            }
        }
    }

    pub fn apply_ptyn(&mut self, address: usize, chars: [char; 4]) {
        for (i, &c) in chars.iter().enumerate() {
            let pos = 4 * address + i;
            if pos < 8 {
                self.ptyn_buf[pos] = c;
            }
        }
    }

    pub fn apply_lps(&mut self, address: usize, chars: &[char]) {
        let stride = chars.len();
        for (i, &c) in chars.iter().enumerate() {
            let pos = stride * address + i;
            if pos < 32 {
                self.lps_buf[pos] = c;
            }
        }
    }

    // -- rendered views -----------------------------------------------------

    fn active_rt(&self) -> usize {
        self.rt_ab as usize
    }

    pub fn rt_active_chars(&self) -> &[char; 64] {
        &self.rt_bufs[self.active_rt()]
    }

    pub fn rt_active_mask(&self) -> &[bool; 64] {
        &self.rt_masks[self.active_rt()]
    }

    /// The 8-character PS buffer as a string (unwritten cells are spaces).
    pub fn ps_string(&self) -> String {
        self.ps_buf.iter().collect()
    }

    pub fn ps_text(&self) -> String {
        self.ps_string().trim().to_string()
    }

    /// Active RadioText up to the carriage-return terminator, controls
    /// stripped, right-trimmed.
    pub fn rt_text(&self) -> String {
        let chars = self.rt_active_chars();
        let term = chars.iter().position(|&c| c == '\r').unwrap_or(64);
        chars[..term]
            .iter()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// Completion: every position before the terminator has been written
    /// since the last A/B flip.
    pub fn rt_complete(&self) -> bool {
        let chars = self.rt_active_chars();
        let term = chars.iter().position(|&c| c == '\r').unwrap_or(63);
        self.rt_active_mask()[..term].iter().all(|&m| m)
    }

    pub fn ptyn_text(&self) -> String {
        self.ptyn_buf.iter().collect::<String>().trim_end().to_string()
    }

    pub fn lps_text(&self) -> String {
        self.lps_buf.iter().collect::<String>().trim_end().to_string()
    }

    // -- analyzer counters --------------------------------------------------

    pub fn note_group(&mut self, name: &str) {
        *self.group_counts.entry(name.to_string()).or_insert(0) += 1;
        self.group_sequence.push(name.to_string());
        if self.group_sequence.len() > SEQUENCE_CAP {
            self.group_sequence.drain(..SEQUENCE_TRIM);
        }
    }

    pub fn reset_analyzer(&mut self) {
        self.group_counts.clear();
        self.group_total = 0;
        self.group_sequence.clear();
    }

    // -- stability + histories ----------------------------------------------

    /// Refresh the PS/RT stability candidates against the current buffers.
    pub fn update_stability(&mut self, now_ms: u64) {
        let ps = self.ps_string();
        if ps != self.ps_candidate {
            self.ps_candidate = ps;
            self.ps_stable_since = now_ms;
        }
        let rt = self.rt_text();
        if rt != self.rt_candidate {
            self.rt_candidate = rt;
            self.rt_stable_since = now_ms;
        }
    }

    /// Append to the rolling histories when the gating conditions hold.
    pub fn maybe_append_histories(&mut self, now_ms: u64) {
        let pi = match self.pi {
            Some(pi) => pi,
            None => return,
        };
        if now_ms.saturating_sub(self.pi_established_ms) <= PI_SETTLE_MS {
            return;
        }

        let ps = self.ps_text();
        if now_ms.saturating_sub(self.ps_stable_since) >= PS_STABLE_MS
            && !ps.is_empty()
            && self.ps_history.first().map(|e| e.ps.as_str()) != Some(ps.as_str())
        {
            self.ps_history.insert(
                0,
                PsHistoryEntry {
                    time: format_hms(now_ms),
                    pi: pi_to_string(pi),
                    ps,
                    pty: self.pty,
                },
            );
            self.ps_history.truncate(HISTORY_CAP);
        }

        let rt = self.rt_text();
        if self.rt_complete()
            && now_ms.saturating_sub(self.rt_stable_since) >= RT_STABLE_MS
            && !rt.is_empty()
            && self.rt_history.first().map(|e| e.text.as_str()) != Some(rt.as_str())
        {
            self.rt_history.insert(
                0,
                RtHistoryEntry {
                    time: format_hms(now_ms),
                    text: rt,
                },
            );
            self.rt_history.truncate(HISTORY_CAP);
        }
    }
}

impl Default for StationState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
