//! Baseline string/path sanitization primitives.
//!
//! These are the primitives [`crate::request::ToolRequest::new`] applies to
//! every scalar field at construction time. The heavier, configurable
//! surface used for audit redaction and prompt rendering (key-based
//! redaction, per-array/total-size bounds) lives in the `superego-sanitize`
//! crate and is built on top of these.

/// Default per-string length cap (1 KiB) applied to any string reaching an
/// external surface.
pub const DEFAULT_STRING_CAP: usize = 1024;

/// Remove non-printable and control characters (everything outside
/// printable ASCII/UTF-8 whitespace), leaving ordinary text untouched.
#[must_use]
pub fn strip_control_chars(s: &str) -> String {
    s.chars().filter(|c| !c.is_control() || *c == ' ' || *c == '\t').collect()
}

/// Truncate `s` to at most `max` bytes, respecting UTF-8 character
/// boundaries.
#[must_use]
pub fn bound_len(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Strip `..` path-traversal segments from a path-like string, returning a
/// normalized (but not filesystem-resolved) path.
#[must_use]
pub fn strip_path_traversal(path: &str) -> String {
    let sep = if path.contains('\\') && !path.contains('/') { '\\' } else { '/' };
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split(sep) {
        if seg == ".." || seg.is_empty() {
            continue;
        }
        out.push(seg);
    }
    let joined = out.join(&sep.to_string());
    if path.starts_with(sep) {
        format!("{sep}{joined}")
    } else {
        joined
    }
}

/// Sanitize an opaque identifier (session id, agent id) down to
/// `[A-Za-z0-9_-]{0,100}`, dropping any other character.
#[must_use]
pub fn sanitize_opaque_id(raw: &str) -> String {
    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect();
    bound_len(&cleaned, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_chars_keeps_space_and_tab() {
        let s = "hello\u{0}\u{1}\tworld \u{7}";
        assert_eq!(strip_control_chars(s), "hello\tworld ");
    }

    #[test]
    fn bounds_respect_utf8_boundaries() {
        let s = "héllo"; // 'é' is 2 bytes
        let bounded = bound_len(s, 2);
        assert!(bounded.len() <= 2);
        assert!(std::str::from_utf8(bounded.as_bytes()).is_ok());
    }

    #[test]
    fn strips_parent_dir_segments() {
        assert_eq!(strip_path_traversal("../../etc/passwd"), "etc/passwd");
        assert_eq!(strip_path_traversal("/a/../b/../../c"), "/a/b/c");
    }

    #[test]
    fn opaque_id_drops_unsupported_chars_and_bounds_length() {
        assert_eq!(sanitize_opaque_id("abc-123_XYZ!@#"), "abc-123_XYZ");
        let long = "a".repeat(200);
        assert_eq!(sanitize_opaque_id(&long).len(), 100);
    }
}
