//! Decode RDS groups into typed payloads.
//!
//! Pure bit-field extraction only; state assembly lives with the engines
//! (`station`, `af`, `tmc`, `eon`, `rtplus`). Layouts follow IEC 62106:
//! - 0A/0B: PS segment + TA/MS/DI flags (+ AF pair in 0A block 3)
//! - 1A/1B: slow labelling (ECC/LIC/TMC id) + programme item number
//! - 2A/2B: RadioText segment with A/B toggle
//! - 4A:    clock time and date (MJD + UTC offset)
//! - 8A:    TMC service info / user message (ISO 14819 single-group)
//! - 10A:   PTYN segment
//! - 14A:   EON variants
//! - 15A/B: Long PS segment
//! - RT+:   two (content type, start, length) tags per payload group

use serde::Serialize;

use crate::charset::{decode_char, decode_ps_char};
use crate::types::{Group, GroupVersion};

// ---------------------------------------------------------------------------
// PS (0A/0B)
// ---------------------------------------------------------------------------

/// One 2-character PS segment plus the flags carried alongside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsSegment {
    pub address: usize,
    pub chars: [char; 2],
    pub ta: bool,
    pub ms: bool,
    pub di_bit: bool,
}

pub fn decode_ps(g: &Group) -> PsSegment {
    let b2 = g.blocks[1];
    let b4 = g.blocks[3];
    PsSegment {
        address: (b2 & 0x3) as usize,
        chars: [
            decode_ps_char((b4 >> 8) as u8),
            decode_ps_char((b4 & 0xFF) as u8),
        ],
        ta: b2 & 0x10 != 0,
        ms: b2 & 0x08 != 0,
        di_bit: b2 & 0x04 != 0,
    }
}

// ---------------------------------------------------------------------------
// RadioText (2A/2B)
// ---------------------------------------------------------------------------

/// One RadioText write: 4 characters for 2A, 2 for 2B.
#[derive(Debug, Clone, PartialEq)]
pub struct RtSegment {
    pub ab_flag: bool,
    pub address: usize,
    pub chars: Vec<char>,
}

pub fn decode_rt(g: &Group) -> RtSegment {
    let b2 = g.blocks[1];
    let b3 = g.blocks[2];
    let b4 = g.blocks[3];
    let chars = match g.version() {
        GroupVersion::A => vec![
            decode_char((b3 >> 8) as u8),
            decode_char((b3 & 0xFF) as u8),
            decode_char((b4 >> 8) as u8),
            decode_char((b4 & 0xFF) as u8),
        ],
        GroupVersion::B => vec![decode_char((b4 >> 8) as u8), decode_char((b4 & 0xFF) as u8)],
    };
    RtSegment {
        ab_flag: b2 & 0x10 != 0,
        address: (b2 & 0x0F) as usize,
        chars,
    }
}

// ---------------------------------------------------------------------------
// PTYN (10A) and Long PS (15A/15B)
// ---------------------------------------------------------------------------

pub fn decode_ptyn(g: &Group) -> (usize, [char; 4]) {
    let b3 = g.blocks[2];
    let b4 = g.blocks[3];
    let address = (g.blocks[1] & 0x01) as usize;
    (
        address,
        [
            decode_ps_char((b3 >> 8) as u8),
            decode_ps_char((b3 & 0xFF) as u8),
            decode_ps_char((b4 >> 8) as u8),
            decode_ps_char((b4 & 0xFF) as u8),
        ],
    )
}

/// Long PS segment: 4 characters per 15A group, 2 per 15B.
pub fn decode_long_ps(g: &Group) -> (usize, Vec<char>) {
    let b3 = g.blocks[2];
    let b4 = g.blocks[3];
    let address = (g.blocks[1] & 0x0F) as usize;
    let chars = match g.version() {
        GroupVersion::A => vec![
            decode_ps_char((b3 >> 8) as u8),
            decode_ps_char((b3 & 0xFF) as u8),
            decode_ps_char((b4 >> 8) as u8),
            decode_ps_char((b4 & 0xFF) as u8),
        ],
        GroupVersion::B => vec![
            decode_ps_char((b4 >> 8) as u8),
            decode_ps_char((b4 & 0xFF) as u8),
        ],
    };
    (address, chars)
}

// ---------------------------------------------------------------------------
// Clock time (4A)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockTime {
    pub utc: String,
    pub local: String,
}

/// Convert a Modified Julian Day number to (day, month, year).
pub fn mjd_to_gregorian(mjd: u32) -> (u32, u32, i32) {
    let m = mjd as f64;
    let yp = ((m - 15_078.2) / 365.25).floor();
    let mp = ((m - 14_956.1 - (yp * 365.25).floor()) / 30.6001).floor();
    let day = m - 14_956.0 - (yp * 365.25).floor() - (mp * 30.6001).floor();
    let k = if mp == 14.0 || mp == 15.0 { 1.0 } else { 0.0 };
    let year = 1900.0 + yp + k;
    let month = mp - 1.0 - 12.0 * k;
    (day as u32, month as u32, year as i32)
}

/// Decode a 4A group. Returns `None` for out-of-range time fields.
pub fn decode_clock(g: &Group) -> Option<ClockTime> {
    let b2 = g.blocks[1] as u32;
    let b3 = g.blocks[2] as u32;
    let b4 = g.blocks[3] as u32;

    let mjd = ((b2 & 0x3) << 15) | ((b3 & 0xFFFE) >> 1);
    if mjd < 15_079 {
        return None;
    }
    let (day, month, year) = mjd_to_gregorian(mjd);

    let word = ((b3 & 1) << 15) | (b4 >> 1);
    let hour = (word >> 11) & 0x1F;
    let minute = (word >> 5) & 0x3F;
    if hour > 23 || minute > 59 || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }

    let negative = (b4 >> 4) & 1 == 1;
    let offset_min = ((b4 & 0x0F) * 30) as i32;
    let utc_min = (hour * 60 + minute) as i32;
    let local_min = (utc_min + if negative { -offset_min } else { offset_min }).rem_euclid(1440);

    let stamp = |min: i32| {
        format!(
            "{day:02}/{month:02}/{year:04} {:02}:{:02}",
            min / 60,
            min % 60
        )
    };
    Some(ClockTime {
        utc: stamp(utc_min),
        local: stamp(local_min),
    })
}

// ---------------------------------------------------------------------------
// Slow labelling + PIN (1A/1B)
// ---------------------------------------------------------------------------

/// Programme Item Number: scheduled start of the current programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgramItem {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// PIN is published only when the day field is non-zero.
pub fn decode_pin(word: u16) -> Option<ProgramItem> {
    let day = ((word >> 11) & 0x1F) as u8;
    if day == 0 {
        return None;
    }
    Some(ProgramItem {
        day,
        hour: ((word >> 6) & 0x1F) as u8,
        minute: (word & 0x3F) as u8,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowLabel {
    Ecc(u8),
    TmcId(u16),
    Lic(u8),
    Other(u8),
}

pub fn decode_slow_label(b3: u16) -> SlowLabel {
    match (b3 >> 12) & 0x7 {
        0 => SlowLabel::Ecc((b3 & 0xFF) as u8),
        1 => SlowLabel::TmcId(b3 & 0xFFF),
        3 => SlowLabel::Lic((b3 & 0xFF) as u8),
        v => SlowLabel::Other(v as u8),
    }
}

// ---------------------------------------------------------------------------
// RT+ payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtPlusRawTag {
    pub content_type: u8,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtPlusPayload {
    pub item_running: bool,
    pub item_toggle: bool,
    pub tags: [RtPlusRawTag; 2],
}

pub fn decode_rt_plus(g: &Group) -> RtPlusPayload {
    let b2 = g.blocks[1];
    let b3 = g.blocks[2];
    let b4 = g.blocks[3];
    RtPlusPayload {
        item_running: b2 & 0x10 != 0,
        item_toggle: b2 & 0x08 != 0,
        tags: [
            RtPlusRawTag {
                content_type: ((b3 >> 13) & 0x7) as u8,
                start: ((b3 >> 7) & 0x3F) as usize,
                len: ((b3 >> 1) & 0x3F) as usize,
            },
            RtPlusRawTag {
                content_type: ((b4 >> 11) & 0x1F) as u8,
                start: ((b4 >> 5) & 0x3F) as usize,
                len: (b4 & 0x1F) as usize,
            },
        ],
    }
}

// ---------------------------------------------------------------------------
// TMC payload (8A)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TmcPayload {
    ServiceInfo {
        ltn: u8,
        afi: bool,
        mode: bool,
        sid: u8,
        variant: u8,
        /// Provider-name characters for tuning variants 4/5: (offset, 4 chars).
        provider_chars: Option<(usize, [char; 4])>,
    },
    UserMessage {
        duration_code: u8,
        diversion: bool,
        direction: bool,
        extent: u8,
        event_code: u16,
        location_code: u16,
    },
}

pub fn decode_tmc(g: &Group) -> TmcPayload {
    let b2 = g.blocks[1];
    let b3 = g.blocks[2];
    let b4 = g.blocks[3];

    if b2 & 0x10 != 0 {
        let variant = (b2 & 0x0F) as u8;
        let provider_chars = if variant == 4 || variant == 5 {
            Some((
                (variant as usize - 4) * 4,
                [
                    decode_ps_char((b3 >> 8) as u8),
                    decode_ps_char((b3 & 0xFF) as u8),
                    decode_ps_char((b4 >> 8) as u8),
                    decode_ps_char((b4 & 0xFF) as u8),
                ],
            ))
        } else {
            None
        };
        TmcPayload::ServiceInfo {
            ltn: ((b3 >> 10) & 0x3F) as u8,
            afi: b3 & 0x200 != 0,
            mode: b3 & 0x100 != 0,
            sid: ((b3 >> 2) & 0x3F) as u8,
            variant,
            provider_chars,
        }
    } else {
        TmcPayload::UserMessage {
            duration_code: (b2 & 0x7) as u8,
            diversion: b3 & 0x8000 != 0,
            direction: b3 & 0x4000 != 0,
            extent: ((b3 >> 11) & 0x7) as u8,
            event_code: b3 & 0x7FF,
            location_code: b4,
        }
    }
}

// ---------------------------------------------------------------------------
// EON variants (14A)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EonVariant {
    Ps { segment: usize, chars: [char; 2] },
    Af { codes: (u8, u8) },
    MappedFreq { src: u8, dst: u8 },
    Linkage(u16),
    PtyTa { pty: u8, ta: bool },
    Pin(ProgramItem),
    Other(u8),
}

/// Decode a 14A group into `(other_pi, variant payload)`.
pub fn decode_eon(g: &Group) -> (u16, EonVariant) {
    let b2 = g.blocks[1];
    let b3 = g.blocks[2];
    let other_pi = g.blocks[3];
    let variant = (b2 & 0x0F) as u8;

    let payload = match variant {
        0..=3 => EonVariant::Ps {
            segment: variant as usize,
            chars: [
                decode_ps_char((b3 >> 8) as u8),
                decode_ps_char((b3 & 0xFF) as u8),
            ],
        },
        4 => EonVariant::Af {
            codes: ((b3 >> 8) as u8, (b3 & 0xFF) as u8),
        },
        5..=9 => EonVariant::MappedFreq {
            src: (b3 >> 8) as u8,
            dst: (b3 & 0xFF) as u8,
        },
        12 => EonVariant::Linkage(b3),
        13 => EonVariant::PtyTa {
            pty: ((b3 >> 11) & 0x1F) as u8,
            ta: b3 & 1 != 0,
        },
        14 => match decode_pin(b3) {
            Some(pin) => EonVariant::Pin(pin),
            None => EonVariant::Other(14),
        },
        v => EonVariant::Other(v),
    };
    (other_pi, payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn g(blocks: [u16; 4]) -> Group {
        Group::new(blocks)
    }

    // -- PS --

    #[test]
    fn test_decode_ps_segment() {
        // 0A, address 2, TA + MS set, chars "RO"
        let b2 = 0x0000 | 0x10 | 0x08 | 0x2;
        let seg = decode_ps(&g([0xD318, b2, 0, u16::from_be_bytes([b'R', b'O'])]));
        assert_eq!(seg.address, 2);
        assert_eq!(seg.chars, ['R', 'O']);
        assert!(seg.ta);
        assert!(seg.ms);
        assert!(!seg.di_bit);
    }

    #[test]
    fn test_decode_ps_nul_padding() {
        let seg = decode_ps(&g([0xD318, 0, 0, 0x0052])); // NUL, 'R'
        assert_eq!(seg.chars, [' ', 'R']);
    }

    // -- RT --

    #[test]
    fn test_decode_rt_2a() {
        let b2 = 0x2000 | 0x10 | 0x3; // 2A, B-buffer, address 3
        let seg = decode_rt(&g([
            0xD318,
            b2,
            u16::from_be_bytes([b'N', b'o']),
            u16::from_be_bytes([b'w', b' ']),
        ]));
        assert!(seg.ab_flag);
        assert_eq!(seg.address, 3);
        assert_eq!(seg.chars, vec!['N', 'o', 'w', ' ']);
    }

    #[test]
    fn test_decode_rt_2b() {
        let b2 = 0x2800 | 0x5; // 2B, address 5
        let seg = decode_rt(&g([0xD318, b2, 0xD318, u16::from_be_bytes([b'h', b'i'])]));
        assert!(!seg.ab_flag);
        assert_eq!(seg.address, 5);
        assert_eq!(seg.chars, vec!['h', 'i']);
    }

    #[test]
    fn test_decode_rt_keeps_terminator() {
        let seg = decode_rt(&g([0xD318, 0x2000, 0x0D20, 0x2020]));
        assert_eq!(seg.chars[0], '\r');
    }

    // -- PTYN / Long PS --

    #[test]
    fn test_decode_ptyn() {
        let (addr, chars) = decode_ptyn(&g([
            0xD318,
            0xA001,
            u16::from_be_bytes([b'R', b'O']),
            u16::from_be_bytes([b'C', b'K']),
        ]));
        assert_eq!(addr, 1);
        assert_eq!(chars, ['R', 'O', 'C', 'K']);
    }

    #[test]
    fn test_decode_long_ps_15a() {
        let (addr, chars) = decode_long_ps(&g([
            0xD318,
            0xF002,
            u16::from_be_bytes([b'a', b'b']),
            u16::from_be_bytes([b'c', b'd']),
        ]));
        assert_eq!(addr, 2);
        assert_eq!(chars, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_decode_long_ps_15b() {
        let (addr, chars) = decode_long_ps(&g([
            0xD318,
            0xF803,
            0xD318,
            u16::from_be_bytes([b'x', b'y']),
        ]));
        assert_eq!(addr, 3);
        assert_eq!(chars, vec!['x', 'y']);
    }

    // -- Clock --

    #[test]
    fn test_mjd_to_gregorian() {
        assert_eq!(mjd_to_gregorian(59_500), (13, 10, 2021));
        // January date exercises the month 14/15 correction
        assert_eq!(mjd_to_gregorian(59_215), (1, 1, 2021));
    }

    #[test]
    fn test_decode_clock_utc_plus_two() {
        // MJD 59500, 14:30 UTC, offset +4 half-hours
        let b2 = 0x4000 | ((59_500u32 >> 15) as u16 & 0x3);
        let b3 = ((59_500u32 & 0x7FFF) as u16) << 1;
        let b4 = (14u16 & 0xF) << 12 | 30 << 6 | 4;
        let ct = decode_clock(&g([0xD318, b2, b3, b4])).unwrap();
        assert_eq!(ct.utc, "13/10/2021 14:30");
        assert_eq!(ct.local, "13/10/2021 16:30");
    }

    #[test]
    fn test_decode_clock_negative_offset_wraps() {
        // 00:10 UTC, offset -1 half-hour -> 23:40 local
        let b2 = 0x4000 | ((59_500u32 >> 15) as u16 & 0x3);
        let b3 = ((59_500u32 & 0x7FFF) as u16) << 1;
        let b4 = 10 << 6 | 1 << 4 | 1;
        let ct = decode_clock(&g([0xD318, b2, b3, b4])).unwrap();
        assert_eq!(ct.utc, "13/10/2021 00:10");
        assert_eq!(ct.local, "13/10/2021 23:40");
    }

    #[test]
    fn test_decode_clock_rejects_invalid_mjd() {
        assert!(decode_clock(&g([0xD318, 0x4000, 0, 0])).is_none());
    }

    // -- PIN / slow labelling --

    #[test]
    fn test_decode_pin() {
        let word = (5u16 << 11) | (14 << 6) | 30;
        assert_eq!(
            decode_pin(word),
            Some(ProgramItem {
                day: 5,
                hour: 14,
                minute: 30
            })
        );
        assert_eq!(decode_pin(0x03FF), None); // day == 0
    }

    #[test]
    fn test_decode_slow_label() {
        assert_eq!(decode_slow_label(0x00E2), SlowLabel::Ecc(0xE2));
        assert_eq!(decode_slow_label(0x1123), SlowLabel::TmcId(0x123));
        assert_eq!(decode_slow_label(0x3009), SlowLabel::Lic(0x09));
        assert_eq!(decode_slow_label(0x7000), SlowLabel::Other(7));
    }

    // -- RT+ --

    #[test]
    fn test_decode_rt_plus_tags() {
        // tag1: type 4, start 13, len 10; tag2: type 1, start 24, len 6
        let b3 = (4u16 << 13) | (13 << 7) | (10 << 1);
        let b4 = (1u16 << 11) | (24 << 5) | 6;
        let p = decode_rt_plus(&g([0xD318, 0xB018, b3, b4]));
        assert!(p.item_running);
        assert!(p.item_toggle);
        assert_eq!(
            p.tags[0],
            RtPlusRawTag {
                content_type: 4,
                start: 13,
                len: 10
            }
        );
        assert_eq!(
            p.tags[1],
            RtPlusRawTag {
                content_type: 1,
                start: 24,
                len: 6
            }
        );
    }

    // -- TMC --

    #[test]
    fn test_decode_tmc_service_info() {
        let b2 = 0x8000 | 0x10; // 8A, tuning flag, variant 0
        let b3 = (9u16 << 10) | 0x200 | (21 << 2);
        match decode_tmc(&g([0xD318, b2, b3, 0])) {
            TmcPayload::ServiceInfo {
                ltn,
                afi,
                mode,
                sid,
                variant,
                provider_chars,
            } => {
                assert_eq!(ltn, 9);
                assert!(afi);
                assert!(!mode);
                assert_eq!(sid, 21);
                assert_eq!(variant, 0);
                assert!(provider_chars.is_none());
            }
            other => panic!("expected service info, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_tmc_provider_chars() {
        let b2 = 0x8000 | 0x10 | 0x5; // tuning variant 5
        let payload = decode_tmc(&g([
            0xD318,
            b2,
            u16::from_be_bytes([b'I', b'N']),
            u16::from_be_bytes([b'F', b'O']),
        ]));
        match payload {
            TmcPayload::ServiceInfo { provider_chars, .. } => {
                assert_eq!(provider_chars, Some((4, ['I', 'N', 'F', 'O'])));
            }
            other => panic!("expected service info, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_tmc_user_message() {
        let b2 = 0x8000 | 0x3; // duration code 3
        let b3 = 0x4000 | (2u16 << 11) | 101; // direction, extent 2, event 101
        match decode_tmc(&g([0xD318, b2, b3, 12_345])) {
            TmcPayload::UserMessage {
                duration_code,
                diversion,
                direction,
                extent,
                event_code,
                location_code,
            } => {
                assert_eq!(duration_code, 3);
                assert!(!diversion);
                assert!(direction);
                assert_eq!(extent, 2);
                assert_eq!(event_code, 101);
                assert_eq!(location_code, 12_345);
            }
            other => panic!("expected user message, got {other:?}"),
        }
    }

    // -- EON --

    #[test]
    fn test_decode_eon_ps_segment() {
        let (pi, v) = decode_eon(&g([
            0xD318,
            0xE001,
            u16::from_be_bytes([b'B', b'R']),
            0x2345,
        ]));
        assert_eq!(pi, 0x2345);
        assert_eq!(
            v,
            EonVariant::Ps {
                segment: 1,
                chars: ['B', 'R']
            }
        );
    }

    #[test]
    fn test_decode_eon_variants() {
        let (_, v) = decode_eon(&g([0xD318, 0xE004, 0x585A, 0x2345]));
        assert_eq!(
            v,
            EonVariant::Af {
                codes: (0x58, 0x5A)
            }
        );

        let (_, v) = decode_eon(&g([0xD318, 0xE007, 0x173A, 0x2345]));
        assert_eq!(v, EonVariant::MappedFreq { src: 0x17, dst: 0x3A });

        let (_, v) = decode_eon(&g([0xD318, 0xE00C, 0xBEEF, 0x2345]));
        assert_eq!(v, EonVariant::Linkage(0xBEEF));

        let (_, v) = decode_eon(&g([0xD318, 0xE00D, (11 << 11) | 1, 0x2345]));
        assert_eq!(v, EonVariant::PtyTa { pty: 11, ta: true });

        let (_, v) = decode_eon(&g([0xD318, 0xE00E, (5 << 11) | (9 << 6) | 15, 0x2345]));
        assert_eq!(
            v,
            EonVariant::Pin(ProgramItem {
                day: 5,
                hour: 9,
                minute: 15
            })
        );

        let (_, v) = decode_eon(&g([0xD318, 0xE00B, 0, 0x2345]));
        assert_eq!(v, EonVariant::Other(11));
    }
}
