//! Shared types, error enum, and group metadata for rds-core.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by rds-core.
#[derive(Debug, Error)]
pub enum RdsError {
    #[error("malformed group record: {0}")]
    MalformedRecord(String),
    #[error("invalid hex block: {0}")]
    InvalidHex(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RdsError>;

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Group version bit (A = 0, B = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupVersion {
    A,
    B,
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupVersion::A => write!(f, "A"),
            GroupVersion::B => write!(f, "B"),
        }
    }
}

/// A single RDS group: four 16-bit blocks. Block 1 is always the PI code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Group {
    pub blocks: [u16; 4],
}

impl Group {
    pub fn new(blocks: [u16; 4]) -> Self {
        Group { blocks }
    }

    /// Program Identification code (block 1).
    pub fn pi(&self) -> u16 {
        self.blocks[0]
    }

    /// Group type, 0-15 (bits 15..12 of block 2).
    pub fn group_type(&self) -> u8 {
        ((self.blocks[1] >> 12) & 0x0F) as u8
    }

    /// Version A or B (bit 11 of block 2).
    pub fn version(&self) -> GroupVersion {
        if (self.blocks[1] >> 11) & 1 == 0 {
            GroupVersion::A
        } else {
            GroupVersion::B
        }
    }

    /// Canonical group name, e.g. "0A", "14B".
    pub fn name(&self) -> String {
        format!("{}{}", self.group_type(), self.version())
    }

    /// 5-bit application group code `(type << 1) | version`, as used by the
    /// ODA registry to address payload groups.
    pub fn app_group_code(&self) -> u8 {
        (self.group_type() << 1)
            | match self.version() {
                GroupVersion::A => 0,
                GroupVersion::B => 1,
            }
    }
}

/// Format a PI code as 4-digit uppercase hex.
pub fn pi_to_string(pi: u16) -> String {
    format!("{pi:04X}")
}

/// Render an application group code (see [`Group::app_group_code`]) as a
/// canonical group name.
pub fn app_group_name(code: u8) -> String {
    format!("{}{}", code >> 1, if code & 1 == 0 { 'A' } else { 'B' })
}

// ---------------------------------------------------------------------------
// Frequencies
// ---------------------------------------------------------------------------

/// An FM carrier frequency stored in tenths of MHz (exact, hashable).
///
/// AF codes 1..=204 map to 87.6..=107.9 MHz in 100 kHz steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Freq(pub u16);

impl Freq {
    /// Decode an AF code byte into a frequency, `None` for filler and
    /// out-of-band codes.
    pub fn from_af_code(code: u8) -> Option<Freq> {
        if (1..=204).contains(&code) {
            Some(Freq(875 + code as u16))
        } else {
            None
        }
    }

    pub fn mhz(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.mhz())
    }
}

impl Serialize for Freq {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.mhz())
    }
}

// ---------------------------------------------------------------------------
// Programme types
// ---------------------------------------------------------------------------

/// Programme Type names (European RDS table, codes 0-31).
pub const PTY_NAMES: [&str; 32] = [
    "None",
    "News",
    "Current Affairs",
    "Information",
    "Sport",
    "Education",
    "Drama",
    "Culture",
    "Science",
    "Varied",
    "Pop Music",
    "Rock Music",
    "Easy Listening",
    "Light Classical",
    "Serious Classical",
    "Other Music",
    "Weather",
    "Finance",
    "Children's Programmes",
    "Social Affairs",
    "Religion",
    "Phone In",
    "Travel",
    "Leisure",
    "Jazz Music",
    "Country Music",
    "National Music",
    "Oldies Music",
    "Folk Music",
    "Documentary",
    "Alarm Test",
    "Alarm",
];

/// Look up the PTY name for a 5-bit code.
pub fn pty_name(pty: u8) -> &'static str {
    PTY_NAMES.get(pty as usize).copied().unwrap_or("None")
}

// ---------------------------------------------------------------------------
// Time formatting
// ---------------------------------------------------------------------------

/// Format an epoch-milliseconds timestamp as "HH:MM:SS" (UTC).
pub fn format_hms(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_type_and_version() {
        let g = Group::new([0xD318, 0x2440, 0, 0]);
        assert_eq!(g.group_type(), 2);
        assert_eq!(g.version(), GroupVersion::A);
        assert_eq!(g.name(), "2A");

        let g = Group::new([0xD318, 0xE800, 0, 0]);
        assert_eq!(g.group_type(), 14);
        assert_eq!(g.version(), GroupVersion::B);
        assert_eq!(g.name(), "14B");
    }

    #[test]
    fn test_group_pi() {
        let g = Group::new([0xD318, 0, 0, 0]);
        assert_eq!(g.pi(), 0xD318);
        assert_eq!(pi_to_string(g.pi()), "D318");
    }

    #[test]
    fn test_app_group_code() {
        let g = Group::new([0, 0xB000, 0, 0]); // 11A
        assert_eq!(g.app_group_code(), 22);
        assert_eq!(app_group_name(22), "11A");

        let g = Group::new([0, 0xB800, 0, 0]); // 11B
        assert_eq!(g.app_group_code(), 23);
        assert_eq!(app_group_name(23), "11B");
    }

    #[test]
    fn test_freq_from_af_code() {
        assert_eq!(Freq::from_af_code(0), None);
        assert_eq!(Freq::from_af_code(205), None);
        assert_eq!(Freq::from_af_code(255), None);

        let f = Freq::from_af_code(88).unwrap();
        assert_eq!(f, Freq(963));
        assert!((f.mhz() - 96.3).abs() < 1e-9);
        assert_eq!(f.to_string(), "96.3");

        assert_eq!(Freq::from_af_code(1).unwrap().to_string(), "87.6");
        assert_eq!(Freq::from_af_code(204).unwrap().to_string(), "107.9");
    }

    #[test]
    fn test_pty_name() {
        assert_eq!(pty_name(0), "None");
        assert_eq!(pty_name(1), "News");
        assert_eq!(pty_name(11), "Rock Music");
        assert_eq!(pty_name(31), "Alarm");
        assert_eq!(pty_name(40), "None"); // out of range
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(1_000 * (13 * 3600 + 5 * 60 + 7)), "13:05:07");
        // Rolls over at midnight
        assert_eq!(format_hms(86_400_000 + 61_000), "00:01:01");
    }
}
