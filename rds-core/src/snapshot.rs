//! Immutable snapshots of the decoder state.
//!
//! The publisher coalesces dirty state into at most one snapshot per
//! scheduler tick. Observers therefore see a monotonic sequence in which a
//! PI change always appears as a clean-slate snapshot (plus whatever the
//! confirming group itself wrote) before new data accumulates.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::af::{AfMethod, BGroupEntry};
use crate::decode::ProgramItem;
use crate::decoder::{RawGroupRecord, RdsDecoder};
use crate::rtplus::RtPlusTag;
use crate::station::{PsHistoryEntry, RtHistoryEntry};
use crate::tmc::{TmcMessage, TmcServiceInfo};
use crate::types::{app_group_name, pi_to_string, pty_name, Freq};

/// One Method-B transmitter group as observers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BGroupView {
    pub transmitter: Freq,
    pub expected: u8,
    pub afs: Vec<Freq>,
    pub match_count: u32,
    pub pair_count: u32,
}

impl BGroupView {
    fn from_entry(transmitter: Freq, e: &BGroupEntry) -> Self {
        BGroupView {
            transmitter,
            expected: e.expected,
            afs: e.afs.iter().copied().collect(),
            match_count: e.match_count,
            pair_count: e.pair_count,
        }
    }
}

/// One other network as observers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EonView {
    pub pi: String,
    pub ps: String,
    pub tp: bool,
    pub ta: bool,
    pub pty: u8,
    pub pin: Option<ProgramItem>,
    pub af_list: Vec<Freq>,
    pub mapped_freqs: Vec<String>,
    pub linkage_info: Option<String>,
    pub last_update_ms: u64,
}

/// A complete, immutable view of the decoder at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub seq: u64,
    pub pi: Option<String>,

    pub ps: String,
    pub lps: String,
    pub ptyn: String,
    pub rt: String,
    pub rt_ab: bool,
    pub rt_complete: bool,

    pub tp: bool,
    pub ta: bool,
    pub ms: bool,
    pub di_stereo: bool,
    pub di_artificial_head: bool,
    pub di_compressed: bool,
    pub di_dynamic_pty: bool,

    pub pty: u8,
    pub pty_name: &'static str,
    pub pin: Option<ProgramItem>,
    pub ecc: Option<String>,
    pub lic: Option<String>,
    pub tmc_id: Option<u16>,
    pub utc_time: Option<String>,
    pub local_time: Option<String>,

    pub af_list: Vec<Freq>,
    pub af_list_head: Option<Freq>,
    pub af_method: AfMethod,
    pub af_b_map: Vec<BGroupView>,

    pub rt_plus_group: Option<String>,
    pub item_running: bool,
    pub item_toggle: bool,
    pub rt_plus_tags: Vec<RtPlusTag>,

    pub eon_networks: Vec<EonView>,

    pub tmc_service: Option<TmcServiceInfo>,
    pub tmc_messages: Vec<TmcMessage>,

    pub ps_history: Vec<PsHistoryEntry>,
    pub rt_history: Vec<RtHistoryEntry>,

    pub ber: f32,
    pub group_total: u64,
    pub group_counts: BTreeMap<String, u64>,
    pub group_sequence: Vec<String>,
    pub recent_groups: Vec<RawGroupRecord>,

    pub analyzer_active: bool,
    pub tmc_active: bool,
    pub tmc_paused: bool,
}

#[derive(Debug, Clone, Default)]
struct AnalyzerView {
    counts: BTreeMap<String, u64>,
    total: u64,
    sequence: Vec<String>,
}

/// Emits at most one snapshot per tick while the decoder is dirty.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    seq: u64,
    frozen: AnalyzerView,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        SnapshotPublisher::default()
    }

    /// Compose a snapshot if anything changed since the last tick.
    pub fn tick(&mut self, dec: &mut RdsDecoder) -> Option<Snapshot> {
        if !dec.is_dirty() {
            return None;
        }

        // While the analyzer runs, track its live counters; once disabled,
        // keep echoing the last published view.
        if dec.analyzer_active() {
            self.frozen = AnalyzerView {
                counts: dec.station.group_counts.clone(),
                total: dec.station.group_total,
                sequence: dec.station.group_sequence.clone(),
            };
        }

        self.seq += 1;
        let recent_groups = dec.take_recent();
        let st = &dec.station;
        let snapshot = Snapshot {
            seq: self.seq,
            pi: st.pi.map(pi_to_string),
            ps: st.ps_string(),
            lps: st.lps_text(),
            ptyn: st.ptyn_text(),
            rt: st.rt_text(),
            rt_ab: st.rt_ab,
            rt_complete: st.rt_complete(),
            tp: st.tp,
            ta: st.ta,
            ms: st.ms,
            di_stereo: st.di_stereo,
            di_artificial_head: st.di_artificial_head,
            di_compressed: st.di_compressed,
            di_dynamic_pty: st.di_dynamic_pty,
            pty: st.pty,
            pty_name: pty_name(st.pty),
            pin: st.pin,
            ecc: st.ecc.clone(),
            lic: st.lic.clone(),
            tmc_id: st.tmc_id,
            utc_time: st.clock.as_ref().map(|c| c.utc.clone()),
            local_time: st.clock.as_ref().map(|c| c.local.clone()),
            af_list: st.af.list.clone(),
            af_list_head: st.af.head,
            af_method: st.af.method,
            af_b_map: st
                .af
                .b_map
                .iter()
                .map(|(&f, e)| BGroupView::from_entry(f, e))
                .collect(),
            rt_plus_group: st.oda.rt_plus_group.map(app_group_name),
            item_running: st.rt_plus.item_running,
            item_toggle: st.rt_plus.item_toggle,
            rt_plus_tags: st.rt_plus.tags.values().cloned().collect(),
            eon_networks: st
                .eon
                .networks
                .values()
                .map(|n| EonView {
                    pi: pi_to_string(n.pi),
                    ps: n.ps(),
                    tp: n.tp,
                    ta: n.ta,
                    pty: n.pty,
                    pin: n.pin,
                    af_list: n.af_list.clone(),
                    mapped_freqs: n.mapped_freqs.clone(),
                    linkage_info: n.linkage_info.clone(),
                    last_update_ms: n.last_update_ms,
                })
                .collect(),
            tmc_service: st.tmc.service.clone(),
            tmc_messages: st.tmc.messages.clone(),
            ps_history: st.ps_history.clone(),
            rt_history: st.rt_history.clone(),
            ber: dec.ber_percent(),
            group_total: self.frozen.total,
            group_counts: self.frozen.counts.clone(),
            group_sequence: self.frozen.sequence.clone(),
            recent_groups,
            analyzer_active: dec.analyzer_active(),
            tmc_active: dec.tmc_active(),
            tmc_paused: dec.tmc_paused(),
        };

        dec.clear_dirty();
        Some(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Group;

    fn group_0a(pi: u16, address: u16, c1: u8, c2: u8) -> Group {
        Group::new([pi, address & 0x3, 0, u16::from_be_bytes([c1, c2])])
    }

    #[test]
    fn test_tick_only_when_dirty() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();
        assert!(publisher.tick(&mut dec).is_none());

        dec.handle_group(&group_0a(0xD318, 0, b'H', b'I'), 0);
        let snap = publisher.tick(&mut dec).expect("dirty after group");
        assert_eq!(snap.seq, 1);
        assert_eq!(snap.pi.as_deref(), Some("D318"));

        // Nothing changed since: no new snapshot
        assert!(publisher.tick(&mut dec).is_none());
    }

    #[test]
    fn test_recent_groups_drained_per_tick() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();
        dec.handle_group(&group_0a(0xD318, 0, b'H', b'I'), 0);
        dec.handle_group(&group_0a(0xD318, 1, b'H', b'O'), 0);

        let snap = publisher.tick(&mut dec).unwrap();
        assert_eq!(snap.recent_groups.len(), 2);
        assert_eq!(snap.recent_groups[0].group, "0A");

        dec.handle_group(&group_0a(0xD318, 2, b'H', b'A'), 0);
        let snap = publisher.tick(&mut dec).unwrap();
        assert_eq!(snap.recent_groups.len(), 1);
    }

    #[test]
    fn test_pi_change_publishes_clean_slate() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();

        for (addr, pair) in [(0, b"BF"), (1, b"M "), (2, b"RO"), (3, b"CK")] {
            dec.handle_group(&group_0a(0xD318, addr, pair[0], pair[1]), 0);
        }
        let before = publisher.tick(&mut dec).unwrap();
        assert_eq!(before.ps, "BFM ROCK");

        for _ in 0..4 {
            dec.handle_group(&group_0a(0x1234, 0, b'N', b'E'), 100);
        }
        let after = publisher.tick(&mut dec).unwrap();
        assert_eq!(after.pi.as_deref(), Some("1234"));
        // Only the confirming group's own write survives the reset
        assert_eq!(after.ps, "NE      ");
        assert!(after.ps_history.is_empty());
        assert!(after.af_list.is_empty());
        assert!(after.tmc_messages.is_empty());
    }

    #[test]
    fn test_analyzer_freeze_echoes_last_values() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();
        dec.set_analyzer_active(true);
        dec.handle_group(&group_0a(0xD318, 0, b'H', b'I'), 0);
        let live = publisher.tick(&mut dec).unwrap();
        assert_eq!(live.group_total, 1);
        assert_eq!(live.group_counts["0A"], 1);

        // Analyzer off: counters no longer accumulate, snapshots echo
        dec.set_analyzer_active(false);
        dec.handle_group(&group_0a(0xD318, 1, b'H', b'O'), 0);
        let frozen = publisher.tick(&mut dec).unwrap();
        assert!(!frozen.analyzer_active);
        assert_eq!(frozen.group_total, 1);
        assert_eq!(frozen.group_counts["0A"], 1);
        assert_eq!(frozen.group_sequence, vec!["0A"]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();
        dec.handle_group(&group_0a(0xD318, 0, b'H', b'I'), 0);
        let snap = publisher.tick(&mut dec).unwrap();

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["pi"], "D318");
        assert_eq!(json["ps"], "HI      ");
        assert_eq!(json["ber"], 0.0);
        assert!(json["recent_groups"].as_array().unwrap().len() == 1);
    }

    #[test]
    fn test_seq_monotonic() {
        let mut dec = RdsDecoder::new();
        let mut publisher = SnapshotPublisher::new();
        let mut last = 0;
        for i in 0..5 {
            dec.handle_group(&group_0a(0xD318, (i % 4) as u16, b'A', b'B'), i);
            let snap = publisher.tick(&mut dec).unwrap();
            assert!(snap.seq > last);
            last = snap.seq;
        }
    }
}
