//! UTF-8 safe string helpers for terminal display.
//!
//! Server responses and file names can carry multi-byte characters, so all
//! truncation here respects character boundaries to avoid slicing panics.

use strip_ansi_escapes::strip;

/// Returns a prefix of the string up to `max_chars` characters.
/// Respects UTF-8 boundaries and won't panic on multi-byte characters.
pub fn safe_prefix(s: &str, max_chars: usize) -> &str {
    if s.is_empty() || max_chars == 0 {
        return "";
    }

    let mut end = s.len();
    for (count, (idx, ch)) in s.char_indices().enumerate() {
        if count == max_chars {
            return &s[..idx];
        }
        end = idx + ch.len_utf8();
    }

    &s[..end.min(s.len())]
}

/// Truncates a string to `max_chars` characters and adds an ellipsis if truncated.
/// Respects UTF-8 boundaries and won't panic on multi-byte characters.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }

    if max_chars <= 1 {
        return String::from("…");
    }

    // Leave room for the ellipsis
    format!("{}…", safe_prefix(s, max_chars.saturating_sub(1)))
}

/// Neutralize escape sequences and control characters in server-provided text
/// before it reaches the terminal. Printable characters pass through untouched
/// so transcriptions still read verbatim.
pub fn sanitize_server_text(raw: &str) -> String {
    let ansi_free = strip(raw.as_bytes());
    String::from_utf8_lossy(&ansi_free)
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}
