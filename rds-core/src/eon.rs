//! Enhanced Other Networks — per-network records from groups 14A/14B.

use std::collections::BTreeMap;

use crate::decode::{self, EonVariant, ProgramItem};
use crate::types::{Freq, Group};

/// Mapped-frequency list bound per network (oldest drops).
pub const MAPPED_FREQ_CAP: usize = 4;

/// Everything known about one other network.
#[derive(Debug, Clone)]
pub struct EonNetwork {
    pub pi: u16,
    ps_buf: [char; 8],
    pub tp: bool,
    pub ta: bool,
    pub pty: u8,
    pub pin: Option<ProgramItem>,
    pub af_list: Vec<Freq>,
    pub mapped_freqs: Vec<String>,
    pub linkage_info: Option<String>,
    pub last_update_ms: u64,
}

impl EonNetwork {
    fn new(pi: u16) -> Self {
        EonNetwork {
            pi,
            ps_buf: [' '; 8],
            tp: false,
            ta: false,
            pty: 0,
            pin: None,
            af_list: Vec::new(),
            mapped_freqs: Vec::new(),
            linkage_info: None,
            last_update_ms: 0,
        }
    }

    pub fn ps(&self) -> String {
        self.ps_buf.iter().collect::<String>().trim_end().to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EonTable {
    pub networks: BTreeMap<u16, EonNetwork>,
}

impl EonTable {
    pub fn new() -> Self {
        EonTable::default()
    }

    pub fn apply_14a(&mut self, g: &Group, now_ms: u64) {
        let (other_pi, variant) = decode::decode_eon(g);
        let tp = g.blocks[1] & 0x10 != 0;
        let net = self
            .networks
            .entry(other_pi)
            .or_insert_with(|| EonNetwork::new(other_pi));
        net.last_update_ms = now_ms;
        net.tp = tp;

        match variant {
            EonVariant::Ps { segment, chars } => {
                if segment < 4 {
                    net.ps_buf[2 * segment] = chars[0];
                    net.ps_buf[2 * segment + 1] = chars[1];
                }
            }
            EonVariant::Af { codes } => {
                for code in [codes.0, codes.1] {
                    if let Some(f) = Freq::from_af_code(code) {
                        if !net.af_list.contains(&f) {
                            net.af_list.push(f);
                            net.af_list.sort();
                        }
                    }
                }
            }
            EonVariant::MappedFreq { src, dst } => {
                if let (Some(s), Some(d)) = (Freq::from_af_code(src), Freq::from_af_code(dst)) {
                    let entry = format!("{s}→{d}");
                    if !net.mapped_freqs.contains(&entry) {
                        net.mapped_freqs.push(entry);
                        if net.mapped_freqs.len() > MAPPED_FREQ_CAP {
                            net.mapped_freqs.remove(0);
                        }
                    }
                }
            }
            EonVariant::Linkage(info) => {
                net.linkage_info = Some(format!("{info:04X}"));
            }
            EonVariant::PtyTa { pty, ta } => {
                net.pty = pty;
                net.ta = ta;
            }
            EonVariant::Pin(pin) => {
                net.pin = Some(pin);
            }
            EonVariant::Other(_) => {}
        }
    }

    /// 14B carries only the other network's TP/TA switch state.
    pub fn apply_14b(&mut self, g: &Group, now_ms: u64) {
        let other_pi = g.blocks[3];
        let b2 = g.blocks[1];
        let net = self
            .networks
            .entry(other_pi)
            .or_insert_with(|| EonNetwork::new(other_pi));
        net.last_update_ms = now_ms;
        net.tp = b2 & 0x10 != 0;
        net.ta = b2 & 0x08 != 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Group;

    fn g14a(variant: u16, b3: u16, other_pi: u16) -> Group {
        Group::new([0xD318, 0xE000 | variant, b3, other_pi])
    }

    #[test]
    fn test_ps_segments() {
        let mut eon = EonTable::new();
        eon.apply_14a(&g14a(0, u16::from_be_bytes([b'R', b'A']), 0x2345), 1);
        eon.apply_14a(&g14a(1, u16::from_be_bytes([b'D', b'I']), 0x2345), 2);
        eon.apply_14a(&g14a(2, u16::from_be_bytes([b'O', b' ']), 0x2345), 3);
        eon.apply_14a(&g14a(3, u16::from_be_bytes([b'3', b' ']), 0x2345), 4);

        let net = &eon.networks[&0x2345];
        assert_eq!(net.ps(), "RADIO 3");
        assert_eq!(net.last_update_ms, 4);
    }

    #[test]
    fn test_af_sorted_unique() {
        let mut eon = EonTable::new();
        eon.apply_14a(&g14a(4, u16::from_be_bytes([90, 30]), 0x2345), 1);
        eon.apply_14a(&g14a(4, u16::from_be_bytes([30, 60]), 0x2345), 2);
        let net = &eon.networks[&0x2345];
        let mhz: Vec<String> = net.af_list.iter().map(|f| f.to_string()).collect();
        assert_eq!(mhz, vec!["90.5", "93.5", "96.5"]);
    }

    #[test]
    fn test_mapped_freqs_capped() {
        let mut eon = EonTable::new();
        for (i, dst) in [10u8, 20, 30, 40, 50].iter().enumerate() {
            eon.apply_14a(&g14a(5, u16::from_be_bytes([88, *dst]), 0x2345), i as u64);
        }
        let net = &eon.networks[&0x2345];
        assert_eq!(net.mapped_freqs.len(), MAPPED_FREQ_CAP);
        // Oldest (dst=10 -> 88.5) dropped
        assert_eq!(net.mapped_freqs[0], "96.3→89.5");
        assert_eq!(net.mapped_freqs[3], "96.3→92.5");
    }

    #[test]
    fn test_pty_ta_and_linkage() {
        let mut eon = EonTable::new();
        eon.apply_14a(&g14a(13, (11 << 11) | 1, 0x2345), 1);
        eon.apply_14a(&g14a(12, 0x0BEE, 0x2345), 2);
        let net = &eon.networks[&0x2345];
        assert_eq!(net.pty, 11);
        assert!(net.ta);
        assert_eq!(net.linkage_info.as_deref(), Some("0BEE"));
    }

    #[test]
    fn test_pin_requires_day() {
        let mut eon = EonTable::new();
        eon.apply_14a(&g14a(14, (6 << 11) | (18 << 6) | 45, 0x2345), 1);
        let net = &eon.networks[&0x2345];
        assert_eq!(
            net.pin,
            Some(ProgramItem {
                day: 6,
                hour: 18,
                minute: 45
            })
        );

        eon.apply_14a(&g14a(14, 0, 0x9999), 2);
        assert!(eon.networks[&0x9999].pin.is_none());
    }

    #[test]
    fn test_14b_sets_ta() {
        let mut eon = EonTable::new();
        let g = Group::new([0xD318, 0xE800 | 0x10 | 0x08, 0xD318, 0x2345]);
        eon.apply_14b(&g, 7);
        let net = &eon.networks[&0x2345];
        assert!(net.tp);
        assert!(net.ta);
        assert_eq!(net.last_update_ms, 7);
    }

    #[test]
    fn test_networks_keyed_by_pi() {
        let mut eon = EonTable::new();
        eon.apply_14a(&g14a(0, 0x2020, 0x1111), 1);
        eon.apply_14a(&g14a(0, 0x2020, 0x2222), 2);
        assert_eq!(eon.networks.len(), 2);
    }
}
