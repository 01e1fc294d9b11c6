//! Four-character codec tags ("FourCC").
//!
//! A tag is packed into an integer with its first character in the least
//! significant byte, so `"mp4v"` is `b'm' | b'p' << 8 | b'4' << 16 | b'v' << 24`.
//! The unpacking below works on the integer value, not on its memory layout,
//! and gives the same answer on any host.

/// Unpack the four tag bytes, first character first.
pub fn fourcc_chars(code: u32) -> [u8; 4] {
    [
        (code & 0xFF) as u8,
        ((code >> 8) & 0xFF) as u8,
        ((code >> 16) & 0xFF) as u8,
        ((code >> 24) & 0xFF) as u8,
    ]
}

pub fn fourcc_code(chars: [u8; 4]) -> u32 {
    chars
        .iter()
        .rev()
        .fold(0, |code, &c| (code << 8) | c as u32)
}

/// Capture backends report the tag as a floating point property
pub fn fourcc_from_property(value: f64) -> u32 {
    value as i64 as u32
}

/// Printable form of a tag, with non-printable bytes shown as '?'
pub fn fourcc_to_string(code: u32) -> String {
    fourcc_chars(code)
        .iter()
        .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack() {
        let code = 0x7634706D; // "mp4v"
        assert_eq!(&fourcc_chars(code), b"mp4v");
        assert_eq!(fourcc_to_string(code), "mp4v");
        assert_eq!(fourcc_code(*b"mp4v"), code);
    }

    #[test]
    fn test_pack_unpack() {
        for tag in [b"XVID", b"avc1", b"MJPG", b"H264"] {
            assert_eq!(&fourcc_chars(fourcc_code(*tag)), tag);
        }
    }

    #[test]
    fn test_from_property() {
        assert_eq!(fourcc_from_property(1983148141.), 0x7634706D);
        assert_eq!(fourcc_to_string(fourcc_from_property(0.)), "????");
    }
}
