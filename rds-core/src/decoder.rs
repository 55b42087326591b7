//! The streaming decoder: transport bytes in, station state out.
//!
//! Pipeline per chunk: frame ingester → PI tracker → group dispatcher →
//! type-specific handler → stability/history bookkeeping. All mutation
//! happens on the caller's execution context; timestamps are supplied by
//! the caller so behavior is reproducible in tests.

use serde::Serialize;

use crate::ber::BerEstimator;
use crate::decode::{self, SlowLabel};
use crate::frame::{FrameEvent, FrameIngester};
use crate::station::StationState;
use crate::types::{format_hms, Group, GroupVersion};

/// Raw-group backlog kept between snapshots.
pub const RECENT_CAP: usize = 3000;

/// PI values must repeat this many times before they replace the station.
pub const PI_CONFIRM_COUNT: u32 = 4;

/// One raw group as observers see it in the snapshot backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawGroupRecord {
    #[serde(rename = "type")]
    pub group: String,
    pub blocks: [u16; 4],
    pub time: String,
}

pub struct RdsDecoder {
    ingester: FrameIngester,
    pub station: StationState,
    ber: BerEstimator,

    pi_candidate: u16,
    pi_counter: u32,

    analyzer_active: bool,
    tmc_active: bool,
    tmc_paused: bool,

    dirty: bool,
    recent: Vec<RawGroupRecord>,
}

impl RdsDecoder {
    pub fn new() -> Self {
        RdsDecoder {
            ingester: FrameIngester::new(),
            station: StationState::new(),
            ber: BerEstimator::new(),
            pi_candidate: 0,
            pi_counter: 0,
            analyzer_active: false,
            tmc_active: true,
            tmc_paused: false,
            dirty: false,
            recent: Vec::new(),
        }
    }

    /// Feed a transport chunk; all extracted frames are processed in order.
    pub fn push_bytes(&mut self, bytes: &[u8], now_ms: u64) {
        for event in self.ingester.push(bytes) {
            self.handle_event(event, now_ms);
        }
    }

    fn handle_event(&mut self, event: FrameEvent, now_ms: u64) {
        match event {
            FrameEvent::Group(g) => self.handle_group(&g, now_ms),
            FrameEvent::Corruption => {
                self.ber.record(true);
                if self.analyzer_active {
                    self.station.note_group("--");
                }
                self.dirty = true;
            }
            FrameEvent::Discard => {
                self.ber.record(true);
                self.dirty = true;
            }
        }
    }

    /// Process one already-framed group.
    pub fn handle_group(&mut self, g: &Group, now_ms: u64) {
        self.track_pi(g.pi(), now_ms);
        // After a PI-triggered reset, the confirming group's own outcome
        // still lands on the fresh estimator
        self.ber.record(false);

        let name = g.name();
        if self.analyzer_active {
            self.station.note_group(&name);
            self.station.group_total += 1;
        }
        self.recent.push(RawGroupRecord {
            group: name,
            blocks: g.blocks,
            time: format_hms(now_ms),
        });
        if self.recent.len() > RECENT_CAP {
            let excess = self.recent.len() - RECENT_CAP;
            self.recent.drain(..excess);
        }

        self.dispatch(g, now_ms);
        self.station.update_stability(now_ms);
        self.station.maybe_append_histories(now_ms);
        self.dirty = true;
    }

    /// Confirmation by repetition, then deep station reset on change.
    fn track_pi(&mut self, pi: u16, now_ms: u64) {
        if pi == self.pi_candidate {
            self.pi_counter += 1;
        } else {
            self.pi_candidate = pi;
            self.pi_counter = 1;
        }

        let confirmed =
            self.pi_counter >= PI_CONFIRM_COUNT || (self.station.pi.is_none() && self.pi_counter >= 1);
        if confirmed && self.station.pi != Some(pi) {
            self.station = StationState::new();
            self.ber = BerEstimator::new();
            self.station.pi = Some(pi);
            self.station.pi_established_ms = now_ms;
        }
    }

    fn dispatch(&mut self, g: &Group, now_ms: u64) {
        let b2 = g.blocks[1];
        self.station.tp = b2 & 0x0400 != 0;
        self.station.pty = ((b2 >> 5) & 0x1F) as u8;

        match (g.group_type(), g.version()) {
            (0, v) => {
                let seg = decode::decode_ps(g);
                self.station.apply_ps(&seg);
                if v == GroupVersion::A {
                    self.station.af.update(g.blocks[2]);
                }
            }
            (1, v) => {
                if v == GroupVersion::A {
                    match decode::decode_slow_label(g.blocks[2]) {
                        SlowLabel::Ecc(ecc) => self.station.ecc = Some(format!("{ecc:02X}")),
                        SlowLabel::Lic(lic) => self.station.lic = Some(format!("{lic:02X}")),
                        SlowLabel::TmcId(id) => self.station.tmc_id = Some(id),
                        SlowLabel::Other(_) => {}
                    }
                }
                if let Some(pin) = decode::decode_pin(g.blocks[3]) {
                    self.station.pin = Some(pin);
                }
            }
            (2, _) => {
                let seg = decode::decode_rt(g);
                self.station.apply_rt(&seg);
            }
            (3, GroupVersion::A) => self.station.oda.register(g),
            (4, GroupVersion::A) => {
                if let Some(clock) = decode::decode_clock(g) {
                    self.station.clock = Some(clock);
                }
            }
            (8, GroupVersion::A) => {
                if self.tmc_active && !self.tmc_paused {
                    let payload = decode::decode_tmc(g);
                    self.station.tmc.apply(&payload, g.pi(), now_ms);
                }
            }
            (10, GroupVersion::A) => {
                let (address, chars) = decode::decode_ptyn(g);
                self.station.apply_ptyn(address, chars);
            }
            (14, GroupVersion::A) => self.station.eon.apply_14a(g, now_ms),
            (14, GroupVersion::B) => self.station.eon.apply_14b(g, now_ms),
            (15, _) => {
                let (address, chars) = decode::decode_long_ps(g);
                self.station.apply_lps(address, &chars);
            }
            _ => {
                if self.station.oda.is_rt_plus_payload(g) {
                    let payload = decode::decode_rt_plus(g);
                    let chars = *self.station.rt_active_chars();
                    self.station.rt_plus.apply(&payload, &chars, now_ms);
                }
            }
        }
    }

    // -- control flags ------------------------------------------------------

    pub fn analyzer_active(&self) -> bool {
        self.analyzer_active
    }

    pub fn set_analyzer_active(&mut self, active: bool) {
        self.analyzer_active = active;
        self.dirty = true;
    }

    /// Clear analyzer counters without touching the rest of the station.
    pub fn reset_analyzer(&mut self) {
        self.station.reset_analyzer();
        self.dirty = true;
    }

    pub fn tmc_active(&self) -> bool {
        self.tmc_active
    }

    /// Disabling TMC also clears the pause flag.
    pub fn set_tmc_active(&mut self, active: bool) {
        self.tmc_active = active;
        if !active {
            self.tmc_paused = false;
        }
        self.dirty = true;
    }

    pub fn tmc_paused(&self) -> bool {
        self.tmc_paused
    }

    pub fn set_tmc_paused(&mut self, paused: bool) {
        self.tmc_paused = paused;
        self.dirty = true;
    }

    // -- observer plumbing --------------------------------------------------

    pub fn ber_percent(&self) -> f32 {
        self.ber.percent()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn take_recent(&mut self) -> Vec<RawGroupRecord> {
        std::mem::take(&mut self.recent)
    }
}

impl Default for RdsDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
