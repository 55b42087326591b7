//! Parse the transport byte stream into RDS groups.
//!
//! Two framings arrive interleaved on the same Windows-1252 stream:
//! - JSON records `{"g1":...,"g2":...,"g3":...,"g4":...}` (extra fields ignored)
//! - hex tuples of four 4-digit blocks separated by whitespace, `:`, `,` or
//!   `-`, where a run of 2-4 dashes marks an uncorrectable block
//!
//! The ingester buffers partial input between chunks and discards from the
//! head when noise keeps the buffer from draining.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::charset;
use crate::types::{Group, RdsError, Result};

/// Unparsed buffer size that triggers the watchdog.
pub const MAX_PENDING_BYTES: usize = 500;
/// Bytes discarded from the head when the watchdog fires.
pub const DISCARD_BYTES: usize = 250;

/// One outcome of the framing scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete, parseable group.
    Group(Group),
    /// A frame containing an uncorrectable block, or a malformed record.
    Corruption,
    /// The watchdog dropped buffered noise.
    Discard,
}

static TUPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9a-f]{4}|-{2,4})[ \t:,-]+?([0-9a-f]{4}|-{2,4})[ \t:,-]+?([0-9a-f]{4}|-{2,4})[ \t:,-]+?([0-9a-f]{4}|-{2,4})",
    )
    .expect("tuple pattern")
});

#[derive(Deserialize)]
struct GroupRecord {
    g1: u16,
    g2: u16,
    g3: u16,
    g4: u16,
}

fn parse_record(text: &str) -> Result<Group> {
    let rec: GroupRecord =
        serde_json::from_str(text).map_err(|e| RdsError::MalformedRecord(e.to_string()))?;
    Ok(Group::new([rec.g1, rec.g2, rec.g3, rec.g4]))
}

/// Accumulates transport bytes and extracts frames.
#[derive(Default)]
pub struct FrameIngester {
    buf: String,
}

impl FrameIngester {
    pub fn new() -> Self {
        FrameIngester { buf: String::new() }
    }

    /// Bytes currently buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Feed a chunk of transport bytes; returns the frames extracted so far.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<FrameEvent> {
        self.buf.extend(bytes.iter().map(|&b| charset::cp1252_char(b)));

        let mut events = Vec::new();
        loop {
            let json = find_json(&self.buf);
            let tuple = find_tuple(&self.buf);

            let json_first = match (&json, &tuple) {
                (Some((js, _)), Some(t)) => *js < t.start,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if json_first {
                let (start, end) = json.unwrap();
                match parse_record(&self.buf[start..end]) {
                    Ok(group) => events.push(FrameEvent::Group(group)),
                    Err(_) => events.push(FrameEvent::Corruption),
                }
                self.buf.replace_range(..end, "");
            } else {
                let t = tuple.unwrap();
                match t.blocks {
                    Some(blocks) => events.push(FrameEvent::Group(Group::new(blocks))),
                    None => events.push(FrameEvent::Corruption),
                }
                self.buf.replace_range(..t.end, "");
            }
        }

        if self.buf.len() > MAX_PENDING_BYTES {
            let mut cut = DISCARD_BYTES;
            while !self.buf.is_char_boundary(cut) {
                cut += 1;
            }
            self.buf.replace_range(..cut, "");
            events.push(FrameEvent::Discard);
        }

        events
    }
}

struct TupleMatch {
    start: usize,
    end: usize,
    /// All four blocks when every token is hex; `None` when any is a dash run.
    blocks: Option<[u16; 4]>,
}

/// Find the first `{...}` pair (first `{`, then the first `}` strictly after).
/// Returns byte offsets (start, end-exclusive).
fn find_json(buf: &str) -> Option<(usize, usize)> {
    let start = buf.find('{')?;
    let close = buf[start + 1..].find('}')?;
    Some((start, start + 1 + close + 1))
}

/// Find the first hex tuple that is not embedded in a longer hex run.
fn find_tuple(buf: &str) -> Option<TupleMatch> {
    let mut from = 0;
    while from < buf.len() {
        let caps = TUPLE_RE.captures(&buf[from..])?;
        let whole = caps.get(0).expect("group 0");
        let (start, end) = (from + whole.start(), from + whole.end());

        let boundary_ok = |c: char| !c.is_ascii_hexdigit() && c != '-';
        let before_ok = start == 0 || buf[..start].chars().next_back().is_some_and(boundary_ok);
        let after_ok = end == buf.len() || buf[end..].chars().next().is_some_and(boundary_ok);

        if before_ok && after_ok {
            let mut blocks = [0u16; 4];
            let mut corrupt = false;
            for (i, slot) in blocks.iter_mut().enumerate() {
                let tok = caps.get(i + 1).expect("token").as_str();
                if tok.starts_with('-') {
                    corrupt = true;
                } else {
                    *slot = u16::from_str_radix(tok, 16).expect("hex token");
                }
            }
            return Some(TupleMatch {
                start,
                end,
                blocks: (!corrupt).then_some(blocks),
            });
        }
        from = start + 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
