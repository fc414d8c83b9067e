//! Log hygiene for player-supplied text. Raw command lines can carry
//! control characters; everything logged goes through here so one input
//! line stays one log line.

/// Longest input preview a log line will carry.
const PREVIEW_CHARS: usize = 160;

/// Escape control characters and clamp length for logging:
/// - `\n`, `\r`, `\t` become their two-character escapes
/// - backslash doubles
/// - other control characters become `\xNN`
/// - anything past the preview cap is replaced with an ellipsis
pub fn sanitize_line(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(PREVIEW_CHARS) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= PREVIEW_CHARS {
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

#[cfg(test)]
mod tests {
    use super::sanitize_line;

    #[test]
    fn control_characters_stay_on_one_line() {
        assert_eq!(
            sanitize_line("go north\r\n\tplease"),
            "go north\\r\\n\\tplease"
        );
        assert_eq!(sanitize_line("a\\b"), "a\\\\b");
        assert_eq!(sanitize_line("bell\x07"), "bell\\x07");
    }

    #[test]
    fn long_input_is_clamped() {
        let long = "x".repeat(500);
        let out = sanitize_line(&long);
        assert!(out.chars().count() <= 161);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn ordinary_text_passes_through() {
        assert_eq!(sanitize_line("/tell bob hi there"), "/tell bob hi there");
        assert_eq!(sanitize_line(""), "");
    }
}
