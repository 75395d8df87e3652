//! Title sanitization and artifact naming for the per-asset output directory.
//!
//! Layout inside `<root>/<title>/`:
//! - `<title> [Video].<ext>` - raw video artifact
//! - `<title> [Audio].<ext>` - raw audio artifact
//! - `<title>.mp4` - merged output

use std::path::{Component, Path};

use super::StreamKind;

/// Maximum UTF-8 length kept from a title.
///
/// Leaves room for the ` [Video].<ext>` suffix under the common 255-byte
/// filename limit.
const MAX_TITLE_BYTES: usize = 200;

/// Used when a title sanitizes down to nothing.
const FALLBACK_TITLE: &str = "untitled";

/// Extension of the merged output container.
pub const MERGED_EXTENSION: &str = "mp4";

/// Sanitizes an asset title for use as a directory name and file stem.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |`) and control characters with `_`, collapses
/// whitespace runs to a single space, strips leading/trailing dots and
/// spaces, and truncates to 200 bytes on a character boundary.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_space = false;
    for ch in title.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => ' ',
            c if c.is_control() => '_',
            c => c,
        };
        if mapped == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(mapped);
    }

    let truncated = truncate_to_bytes(
        out.trim_matches(|c: char| c == '.' || c == ' '),
        MAX_TITLE_BYTES,
    );
    let trimmed = truncated.trim_end_matches(|c: char| c == '.' || c == ' ');

    if trimmed.is_empty() || !is_single_normal_component(trimmed) {
        return FALLBACK_TITLE.to_string();
    }
    trimmed.to_string()
}

/// Returns the extension for a MIME type: its subtype without parameters.
///
/// `video/webm` → `webm`, `audio/mp4; codecs="mp4a.40.2"` → `mp4`.
/// Falls back to `bin` when no usable subtype exists.
#[must_use]
pub fn extension_from_mime(mime_type: &str) -> String {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    let subtype = essence
        .split_once('/')
        .map(|(_, sub)| sub.trim().to_lowercase())
        .unwrap_or_default();

    let valid = !subtype.is_empty()
        && subtype.len() <= 12
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.'));
    if valid { subtype } else { "bin".to_string() }
}

/// Filename of a raw stream artifact: `<title> [Video].<ext>`.
#[must_use]
pub fn artifact_filename(safe_title: &str, kind: StreamKind, extension: &str) -> String {
    format!("{safe_title} [{}].{extension}", kind.label())
}

/// Filename of the merged output: `<title>.mp4`.
#[must_use]
pub fn merged_filename(safe_title: &str) -> String {
    format!("{safe_title}.{MERGED_EXTENSION}")
}

fn truncate_to_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn is_single_normal_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title_removes_invalid_chars() {
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_title_collapses_whitespace() {
        assert_eq!(sanitize_title("Live   at\tWembley\n1986"), "Live at Wembley 1986");
    }

    #[test]
    fn test_sanitize_title_strips_dots_and_spaces_at_edges() {
        assert_eq!(sanitize_title("  ..Hidden title.. "), "Hidden title");
    }

    #[test]
    fn test_sanitize_title_dot_segments_fall_back() {
        assert_eq!(sanitize_title(".."), FALLBACK_TITLE);
        assert_eq!(sanitize_title("."), FALLBACK_TITLE);
        assert_eq!(sanitize_title("   "), FALLBACK_TITLE);
        assert_eq!(sanitize_title(""), FALLBACK_TITLE);
    }

    #[test]
    fn test_sanitize_title_preserves_unicode() {
        assert_eq!(sanitize_title("日本語 (Official)"), "日本語 (Official)");
    }

    #[test]
    fn test_sanitize_title_truncates_long_titles() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).len(), MAX_TITLE_BYTES);
    }

    #[test]
    fn test_sanitize_title_truncates_multibyte_on_char_boundary() {
        // 3 bytes per char: 66 whole chars fit in 200 bytes.
        let cjk = sanitize_title(&"日".repeat(100));
        assert_eq!(cjk, "日".repeat(66));

        // 4 bytes per char: 50 whole chars.
        let emoji = sanitize_title(&"🎬".repeat(100));
        assert_eq!(emoji.chars().count(), 50);
        assert!(emoji.len() <= MAX_TITLE_BYTES);
    }

    #[test]
    fn test_artifact_name_of_long_title_fits_filesystem_limit() {
        let safe = sanitize_title(&"日".repeat(300));
        let name = artifact_filename(&safe, StreamKind::Video, "webm");
        assert!(name.len() <= 255);
    }

    #[test]
    fn test_sanitize_title_never_escapes_directory() {
        let sanitized = sanitize_title("../../etc/passwd");
        assert!(!sanitized.contains('/'));
        assert!(is_single_normal_component(&sanitized));
    }

    #[test]
    fn test_extension_from_mime_variants() {
        assert_eq!(extension_from_mime("video/mp4"), "mp4");
        assert_eq!(extension_from_mime("video/webm; codecs=\"vp9\""), "webm");
        assert_eq!(extension_from_mime("AUDIO/WEBM"), "webm");
        assert_eq!(extension_from_mime("audio/mp4"), "mp4");
    }

    #[test]
    fn test_extension_from_mime_falls_back_to_bin() {
        assert_eq!(extension_from_mime(""), "bin");
        assert_eq!(extension_from_mime("video"), "bin");
        assert_eq!(extension_from_mime("video/"), "bin");
        assert_eq!(extension_from_mime("video/../../x"), "bin");
    }

    #[test]
    fn test_artifact_and_merged_filenames() {
        assert_eq!(
            artifact_filename("My Clip", StreamKind::Video, "webm"),
            "My Clip [Video].webm"
        );
        assert_eq!(
            artifact_filename("My Clip", StreamKind::Audio, "mp4"),
            "My Clip [Audio].mp4"
        );
        assert_eq!(merged_filename("My Clip"), "My Clip.mp4");
    }
}
