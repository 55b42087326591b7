//! RDS character decoding.
//!
//! Text fields on the RDS subcarrier use the basic G0 set (ASCII-compatible)
//! plus the G2 Latin supplement for bytes 0x80..0xBF (IEC 62106 annex E).
//! Everything else falls back to Windows-1252, which is also the encoding
//! of the transport byte stream.

/// G2 Latin supplement, indexed by `byte - 0x80` (64 entries).
const G2_SUPPLEMENT: [char; 64] = [
    // 0x80..0x8F
    'á', 'à', 'é', 'è', 'í', 'ì', 'ó', 'ò', 'ú', 'ù', 'Ñ', 'Ç', 'Ş', 'ß', '¡', 'Ĳ',
    // 0x90..0x9F
    'â', 'ä', 'ê', 'ë', 'î', 'ï', 'ô', 'ö', 'û', 'ü', 'ñ', 'ç', 'ş', 'ğ', 'ı', 'ĳ',
    // 0xA0..0xAF
    'ª', 'α', '©', '‰', 'Ğ', 'ě', 'ň', 'ő', 'π', '€', '£', '$', '←', '↑', '→', '↓',
    // 0xB0..0xBF
    'º', '¹', '²', '³', '±', 'İ', 'ń', 'ű', 'µ', '¿', '÷', '°', '¼', '½', '¾', '§',
];

/// Windows-1252 mappings for the 0x80..0x9F range (the only place where
/// cp1252 departs from Latin-1). 0x81, 0x8D, 0x8F, 0x90 and 0x9D are
/// unassigned and map to the replacement character.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ',
    '\u{FFFD}', 'ž', 'Ÿ',
];

/// Decode a single transport byte as Windows-1252.
pub fn cp1252_char(b: u8) -> char {
    match b {
        0x00..=0x7F => b as char,
        0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
        _ => char::from_u32(b as u32).unwrap_or('\u{FFFD}'),
    }
}

/// Decode an RDS text byte (RT and other non-PS fields).
///
/// Control bytes pass through unchanged; 0x0D in particular terminates
/// RadioText.
pub fn decode_char(b: u8) -> char {
    match b {
        0x00..=0x1F => b as char,
        0x20..=0x7F => b as char,
        0x80..=0xBF => G2_SUPPLEMENT[(b - 0x80) as usize],
        _ => cp1252_char(b),
    }
}

/// Decode a byte destined for a PS-family buffer (PS, PTYN, Long PS).
/// NUL becomes a space; otherwise identical to [`decode_char`].
pub fn decode_ps_char(b: u8) -> char {
    if b == 0 {
        ' '
    } else {
        decode_char(b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(decode_char(b'A'), 'A');
        assert_eq!(decode_char(b' '), ' ');
        assert_eq!(decode_char(0x7E), '~');
    }

    #[test]
    fn test_g2_supplement() {
        assert_eq!(decode_char(0x80), 'á');
        assert_eq!(decode_char(0x8D), 'ß');
        assert_eq!(decode_char(0xA9), '€');
        assert_eq!(decode_char(0xAA), '£');
        assert_eq!(decode_char(0xAB), '$');
        assert_eq!(decode_char(0xBF), '§');
    }

    #[test]
    fn test_control_passthrough() {
        assert_eq!(decode_char(0x0D), '\r');
        assert_eq!(decode_char(0x00), '\0');
    }

    #[test]
    fn test_high_fallback_is_latin1() {
        assert_eq!(decode_char(0xC0), 'À');
        assert_eq!(decode_char(0xE9), 'é');
        assert_eq!(decode_char(0xFF), 'ÿ');
    }

    #[test]
    fn test_ps_nul_becomes_space() {
        assert_eq!(decode_ps_char(0x00), ' ');
        assert_eq!(decode_ps_char(b'R'), 'R');
        assert_eq!(decode_ps_char(0x8D), 'ß');
    }

    #[test]
    fn test_cp1252_high_range() {
        assert_eq!(cp1252_char(0x80), '€');
        assert_eq!(cp1252_char(0x93), '“');
        assert_eq!(cp1252_char(0xE9), 'é');
        assert_eq!(cp1252_char(0x81), '\u{FFFD}');
    }
}
