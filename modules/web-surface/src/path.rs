//! Turning a final URL path into a map key that is also safe on disk.

use std::borrow::Cow;

const MAX_SEGMENT: usize = 255;
const UNSAFE: &[&str] = &[
    "..", "\0", " ", "*", "?", "[", "]", "`", "$", "\"", "'", ":", "\\", "<", ">", "|",
];

/// Percent-decode `raw` and sanitize every `/`-separated segment.
/// The result always starts with `/`.
pub fn normalize_path(raw: &str) -> String {
    let decoded = match urlencoding::decode(raw) {
        Ok(s) => s,
        Err(_) => Cow::Owned(String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()),
    };
    let trimmed = decoded.strip_prefix('/').unwrap_or(&*decoded);
    let segments: Vec<String> = trimmed.split('/').map(sanitize_segment).collect();
    format!("/{}", segments.join("/"))
}

pub fn sanitize_segment(segment: &str) -> String {
    if segment == "." {
        return "_".to_string();
    }
    let mut out = segment.to_string();
    for bad in UNSAFE {
        if out.contains(bad) {
            out = out.replace(bad, "_");
        }
    }
    if out.len() > MAX_SEGMENT {
        let mut cut = MAX_SEGMENT;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_stays_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn decodes_then_sanitizes() {
        assert_eq!(normalize_path("/a%20b/c"), "/a_b/c");
        assert_eq!(normalize_path("/%2e%2e/etc/passwd"), "/_/etc/passwd");
        assert_eq!(normalize_path("/./x"), "/_/x");
        assert_eq!(normalize_path("/what?:<>|"), "/what_____");
        assert_eq!(normalize_path("/dir/"), "/dir/");
    }

    #[test]
    fn long_segments_are_truncated_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_segment(&long);
        assert!(out.len() <= 255);
        assert_eq!(out.chars().count(), 127);
    }
}
