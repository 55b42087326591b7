//! ODA registry (group 3A) and RadioText+ tag extraction.
//!
//! 3A groups bind an Application Identifier to the group type that carries
//! its payloads. RT+ (AID 0x4BD7) is the application this decoder acts on:
//! its payload groups carry two (content type, start, length) tags that
//! slice semantic fields out of the currently active RadioText buffer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::decode::RtPlusPayload;
use crate::types::{Group, GroupVersion};

/// RadioText+ Application Identifier.
pub const RT_PLUS_AID: u16 = 0x4BD7;

/// Most-recently-updated tags kept per station.
pub const TAG_CAP: usize = 6;

/// Known ODA applications (subset relevant to FM broadcast monitoring).
pub const ODA_APPS: &[(u16, &str)] = &[
    (0x0D45, "RDS-TMC: ALERT-C / EN ISO 14819-1"),
    (0x4BD7, "RadioText+ (RT+)"),
    (0x4BD8, "RadioText+ for eRT"),
    (0x6552, "Enhanced RadioText (eRT)"),
    (0xC350, "NRSC Song Title and Artist"),
    (0xCD46, "RDS-TMC: ALERT-C"),
    (0xCD47, "RDS-TMC: ALERT-C"),
];

/// Look up a human-readable ODA application name.
pub fn oda_app_name(aid: u16) -> &'static str {
    ODA_APPS
        .iter()
        .find(|(id, _)| *id == aid)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown ODA")
}

/// RT+ content-type class names (codes 0-63).
pub const RT_PLUS_CLASS_NAMES: [&str; 64] = [
    "dummy_class",
    "item.title",
    "item.album",
    "item.tracknumber",
    "item.artist",
    "item.composition",
    "item.movement",
    "item.conductor",
    "item.composer",
    "item.band",
    "item.comment",
    "item.genre",
    "info.news",
    "info.news.local",
    "info.stockmarket",
    "info.sport",
    "info.lottery",
    "info.horoscope",
    "info.daily_diversion",
    "info.health",
    "info.event",
    "info.scene",
    "info.cinema",
    "info.tv",
    "info.date_time",
    "info.weather",
    "info.traffic",
    "info.alarm",
    "info.advertisement",
    "info.url",
    "info.other",
    "stationname.short",
    "stationname.long",
    "programme.now",
    "programme.next",
    "programme.part",
    "programme.host",
    "programme.editorial_staff",
    "programme.frequency",
    "programme.homepage",
    "programme.subchannel",
    "phone.hotline",
    "phone.studio",
    "phone.other",
    "sms.studio",
    "sms.other",
    "email.hotline",
    "email.studio",
    "email.other",
    "mms.other",
    "chat",
    "chat.centre",
    "vote.question",
    "vote.centre",
    "unassigned_54",
    "unassigned_55",
    "unassigned_56",
    "place",
    "appointment",
    "identifier",
    "purchase",
    "get_data",
    "unassigned_62",
    "unassigned_63",
];

// ---------------------------------------------------------------------------
// ODA registry
// ---------------------------------------------------------------------------

/// Bindings announced via group 3A: AID → 5-bit application group code.
#[derive(Debug, Clone, Default)]
pub struct OdaRegistry {
    pub bindings: BTreeMap<u16, u8>,
    /// Application group code carrying RT+ payloads, once announced.
    pub rt_plus_group: Option<u8>,
}

impl OdaRegistry {
    pub fn new() -> Self {
        OdaRegistry::default()
    }

    /// Register a 3A group.
    pub fn register(&mut self, g: &Group) {
        let code = (g.blocks[1] & 0x1F) as u8;
        self.bindings.insert(g.blocks[3], code);
        if g.blocks[2] == RT_PLUS_AID || g.blocks[3] == RT_PLUS_AID {
            self.rt_plus_group = Some(code);
        }
    }

    /// True when `g` should be handed to the RT+ extractor: either the
    /// announced application group, or the canonical 11A/12A carriers.
    pub fn is_rt_plus_payload(&self, g: &Group) -> bool {
        let code = g.app_group_code();
        if self.rt_plus_group == Some(code) {
            return true;
        }
        g.version() == GroupVersion::A && matches!(g.group_type(), 11 | 12)
    }
}

// ---------------------------------------------------------------------------
// RT+ state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtPlusTag {
    pub content_type: u8,
    pub label: &'static str,
    pub text: String,
    pub start: usize,
    pub length: usize,
    pub updated_ms: u64,
    /// Set when the underlying RadioText buffer has flipped since capture.
    pub is_cached: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RtPlusState {
    pub tags: BTreeMap<u8, RtPlusTag>,
    pub item_running: bool,
    pub item_toggle: bool,
}

impl RtPlusState {
    pub fn new() -> Self {
        RtPlusState::default()
    }

    /// Apply one RT+ payload against the active RadioText buffer.
    pub fn apply(&mut self, payload: &RtPlusPayload, rt_chars: &[char; 64], now_ms: u64) {
        self.item_running = payload.item_running;
        self.item_toggle = payload.item_toggle;

        for tag in payload.tags {
            if tag.content_type == 0 || tag.start >= rt_chars.len() {
                continue;
            }
            let end = (tag.start + tag.len + 1).min(rt_chars.len());
            let text: String = rt_chars[tag.start..end]
                .iter()
                .filter(|c| !c.is_control())
                .collect::<String>()
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            self.tags.insert(
                tag.content_type,
                RtPlusTag {
                    content_type: tag.content_type,
                    label: RT_PLUS_CLASS_NAMES[tag.content_type as usize % 64],
                    text,
                    start: tag.start,
                    length: tag.len,
                    updated_ms: now_ms,
                    is_cached: false,
                },
            );
        }

        while self.tags.len() > TAG_CAP {
            let oldest = self
                .tags
                .values()
                .min_by_key(|t| (t.updated_ms, t.content_type))
                .map(|t| t.content_type)
                .expect("non-empty");
            self.tags.remove(&oldest);
        }
    }

    /// Mark every tag stale; called on an RT A/B flip.
    pub fn mark_stale(&mut self) {
        for tag in self.tags.values_mut() {
            tag.is_cached = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
