//! TMC (Traffic Message Channel) engine — ISO 14819 over group 8A.
//!
//! Tuning-flag groups carry service info (LTN/AFI/mode/SID, provider name in
//! variants 4/5); the rest are single-group user messages. Messages with the
//! same (location, event, direction, extent) are merged rather than repeated.

use serde::Serialize;

use crate::decode::TmcPayload;

/// Bounded message buffer, newest first.
pub const MESSAGE_CAP: usize = 100;

/// Duration code labels (ISO 14819 duration/persistence, code 0-7).
pub const DURATION_LABELS: [&str; 8] = [
    "No duration",
    "15 minutes",
    "30 minutes",
    "1 hour",
    "2 hours",
    "3 hours",
    "4 hours",
    "Longer Lasting",
];

/// Expiry horizon per duration code, in minutes.
const DURATION_MINUTES: [u64; 8] = [15, 15, 30, 60, 120, 180, 240, 480];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Nature {
    Dynamic,
    LongerLasting,
}

/// Service (tuning) information for the carried TMC service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TmcServiceInfo {
    pub ltn: u8,
    pub afi: bool,
    pub mode: bool,
    pub sid: u8,
    pub provider_name: String,
}

/// A decoded ALERT-C user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TmcMessage {
    pub id: u64,
    pub received_time: u64,
    pub expires_time: u64,
    pub cc: u8,
    pub event_code: u16,
    pub location_code: u16,
    pub extent: u8,
    pub direction: bool,
    pub diversion: bool,
    pub duration_code: u8,
    pub duration_label: &'static str,
    pub urgency: Urgency,
    pub nature: Nature,
    pub update_count: u32,
}

#[derive(Debug, Clone)]
pub struct TmcEngine {
    pub service: Option<TmcServiceInfo>,
    provider_buf: [char; 8],
    pub messages: Vec<TmcMessage>,
    next_id: u64,
}

impl TmcEngine {
    pub fn new() -> Self {
        TmcEngine {
            service: None,
            provider_buf: [' '; 8],
            messages: Vec::new(),
            next_id: 1,
        }
    }

    pub fn apply(&mut self, payload: &TmcPayload, pi: u16, now_ms: u64) {
        match payload {
            TmcPayload::ServiceInfo {
                ltn,
                afi,
                mode,
                sid,
                provider_chars,
                ..
            } => {
                if let Some((offset, chars)) = provider_chars {
                    for (i, &c) in chars.iter().enumerate() {
                        if offset + i < 8 {
                            self.provider_buf[offset + i] = c;
                        }
                    }
                }
                if *ltn > 0 || *sid > 0 {
                    self.service = Some(TmcServiceInfo {
                        ltn: *ltn,
                        afi: *afi,
                        mode: *mode,
                        sid: *sid,
                        provider_name: self.provider_buf.iter().collect::<String>().trim().to_string(),
                    });
                }
            }
            TmcPayload::UserMessage {
                duration_code,
                diversion,
                direction,
                extent,
                event_code,
                location_code,
            } => {
                let expires = now_ms + DURATION_MINUTES[*duration_code as usize % 8] * 60_000;

                if let Some(existing) = self.messages.iter_mut().find(|m| {
                    m.location_code == *location_code
                        && m.event_code == *event_code
                        && m.direction == *direction
                        && m.extent == *extent
                }) {
                    existing.received_time = now_ms;
                    existing.expires_time = expires;
                    existing.update_count += 1;
                    return;
                }

                let msg = TmcMessage {
                    id: self.next_id,
                    received_time: now_ms,
                    expires_time: expires,
                    cc: (pi >> 12) as u8,
                    event_code: *event_code,
                    location_code: *location_code,
                    extent: *extent,
                    direction: *direction,
                    diversion: *diversion,
                    duration_code: *duration_code,
                    duration_label: DURATION_LABELS[*duration_code as usize % 8],
                    urgency: if *diversion {
                        Urgency::Urgent
                    } else {
                        Urgency::Normal
                    },
                    nature: if *duration_code == 7 {
                        Nature::LongerLasting
                    } else {
                        Nature::Dynamic
                    },
                    update_count: 1,
                };
                self.next_id += 1;
                self.messages.insert(0, msg);
                self.messages.truncate(MESSAGE_CAP);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
