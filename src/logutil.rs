//! Keeps parent- and child-entered text (words, notes, prize names) on one log line.

/// Longest preview of user text written to a log line.
const MAX_PREVIEW: usize = 80;

/// Quote `s` for logging: control characters and quotes are escaped the way `{:?}` does,
/// and anything past [`MAX_PREVIEW`] characters is replaced by an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 2);
    out.push('"');
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        out.extend(ch.escape_debug());
    }
    out.push('"');
    out
}
