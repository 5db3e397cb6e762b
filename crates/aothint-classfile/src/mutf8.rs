//! Modified UTF-8 as stored in `CONSTANT_Utf8` entries
//!
//! Differs from standard UTF-8 in two places: NUL is written as the two-byte
//! sequence `C0 80`, and supplementary characters are written as a surrogate
//! pair of three-byte sequences.

/// Decode modified UTF-8, returning `None` on malformed input
pub fn decode(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_owned());
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b1 = bytes[i] as u16;
        if b1 & 0x80 == 0 {
            units.push(b1);
            i += 1;
        } else if b1 & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            units.push(((b1 & 0x1F) << 6) | b2);
            i += 2;
        } else if b1 & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            units.push(((b1 & 0x0F) << 12) | (b2 << 6) | b3);
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

fn continuation(bytes: &[u8], index: usize) -> Option<u16> {
    let byte = *bytes.get(index)?;
    (byte & 0xC0 == 0x80).then_some((byte & 0x3F) as u16)
}

/// Encode a string as modified UTF-8
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_unchanged() {
        assert_eq!(encode("java/lang/Object"), b"java/lang/Object".to_vec());
        assert_eq!(decode(b"java/lang/Object").as_deref(), Some("java/lang/Object"));
    }

    #[test]
    fn test_nul_uses_two_bytes() {
        let encoded = encode("a\0b");
        assert_eq!(encoded, vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&encoded).as_deref(), Some("a\0b"));
    }

    #[test]
    fn test_supplementary_characters_use_surrogate_pairs() {
        let text = "x\u{1F600}y";
        let encoded = encode(text);
        // one byte, two three-byte surrogates, one byte
        assert_eq!(encoded.len(), 8);
        assert_eq!(encoded[1], 0xED);
        assert_eq!(decode(&encoded).as_deref(), Some(text));
    }

    #[test]
    fn test_truncated_sequence_is_rejected() {
        assert_eq!(decode(&[b'a', 0xE2, 0x82]), None);
        assert_eq!(decode(&[0xC3]), None);
    }
}
