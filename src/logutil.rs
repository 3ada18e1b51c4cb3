//! Logging utilities for keeping records single-line.
//! User text (names, companion chat) and raw packet bytes pass through here
//! before they reach a log macro.

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Truncates very long strings (over `MAX_PREVIEW` chars) with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 300;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Space-separated hex of the first `limit` bytes, with the total length
/// appended when the input is longer.
pub fn hex_preview(bytes: &[u8], limit: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(limit.min(bytes.len()) * 3 + 16);
    for (i, b) in bytes.iter().take(limit).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(&mut out, "{:02X}", b);
    }
    if bytes.len() > limit {
        let _ = write!(&mut out, " … ({} bytes)", bytes.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_log, hex_preview};

    #[test]
    fn escapes_newlines_and_truncates() {
        let s = "Line1\nLine2\r\tEnd";
        assert_eq!(escape_log(s), "Line1\\nLine2\\r\\tEnd");
        let long = "x".repeat(400);
        assert!(escape_log(&long).ends_with('…'));
    }

    #[test]
    fn hex_preview_caps_output() {
        assert_eq!(hex_preview(&[0x8F, 0x00, 0x0A], 8), "8F 00 0A");
        assert_eq!(hex_preview(&[1, 2, 3, 4], 2), "01 02 … (4 bytes)");
        assert_eq!(hex_preview(&[], 4), "");
    }
}
