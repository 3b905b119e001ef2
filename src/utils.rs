/// Truncate a string to at most `max_bytes` bytes without splitting a multi-byte
/// character. Returns the original string if it already fits.
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Single-line preview for log fields: newlines collapsed, `...` appended
/// when truncated.
pub fn log_preview(s: &str, max_bytes: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = safe_truncate(&flat, max_bytes);
    if cut.len() < flat.len() {
        format!("{}...", cut)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_within_limit() {
        assert_eq!(safe_truncate("hello", 10), "hello");
    }

    #[test]
    fn ascii_truncated() {
        assert_eq!(safe_truncate("hello world", 5), "hello");
    }

    #[test]
    fn devanagari_no_split() {
        // "नमस्ते" is 6 chars × 3 bytes
        let s = "नमस्ते";
        assert_eq!(safe_truncate(s, 7), "नम");
    }

    #[test]
    fn thai_exact_boundary() {
        let s = "สวัสดี";
        assert_eq!(safe_truncate(s, 6), "สว");
    }

    #[test]
    fn zero_max() {
        assert_eq!(safe_truncate("hello", 0), "");
    }

    #[test]
    fn preview_collapses_newlines() {
        assert_eq!(log_preview("Dear Mom,\n\nI need space.", 100), "Dear Mom, I need space.");
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(log_preview("abcdefgh", 4), "abcd...");
    }
}
