//! Cache filename conventions.
//!
//! This module is the single source of truth for how cached artifacts are
//! named on disk:
//! - Artifact filenames (e.g., `42_Sunset.png`)
//! - Sanitization of references and display names
//! - Recovery of reference and title from an existing filename
//!
//! # Format
//!
//! `{reference}{SEPARATOR}{sanitized_display_name}.{extension}`
//!
//! The raw reference is always the filename prefix, so two different
//! references can never collapse onto the same file even when their display
//! names sanitize identically.

/// Delimiter between the reference and the display name in a filename.
pub const SEPARATOR: char = '_';

/// Extension used when neither the server nor the URL tells us one.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Characters that are never allowed in a cache filename.
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace whitespace and path-unsafe characters with underscores.
///
/// # Examples
///
/// ```
/// use wallstash::cache::naming::sanitize;
///
/// assert_eq!(sanitize("My Wallpaper"), "My_Wallpaper");
/// assert_eq!(sanitize("a/b:c"), "a_b_c");
/// assert_eq!(sanitize("Sunset"), "Sunset");
/// ```
pub fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c.is_control() || UNSAFE_CHARS.contains(&c) {
                SEPARATOR
            } else {
                c
            }
        })
        .collect()
}

/// Normalize a file extension (lowercase, no leading dot).
///
/// Falls back to [`DEFAULT_EXTENSION`] when the input is empty.
pub fn normalize_extension(extension: &str) -> String {
    let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

/// Build the cache filename for an artifact.
///
/// A display name that sanitizes to nothing yields `{reference}.{ext}`.
///
/// # Examples
///
/// ```
/// use wallstash::cache::naming::cache_filename;
///
/// assert_eq!(cache_filename("42", "Sunset", "png"), "42_Sunset.png");
/// assert_eq!(cache_filename("7", "Blue Hour", ".JPG"), "7_Blue_Hour.jpg");
/// assert_eq!(cache_filename("9", "   ", "webp"), "9.webp");
/// ```
pub fn cache_filename(reference: &str, display_name: &str, extension: &str) -> String {
    let reference = sanitize(reference);
    let title = sanitize(display_name);
    let ext = normalize_extension(extension);

    if title.is_empty() {
        format!("{}.{}", reference, ext)
    } else {
        format!("{}{}{}.{}", reference, SEPARATOR, title, ext)
    }
}

/// Reference and title recovered from a cache filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Reference taken from the filename prefix.
    pub reference: String,
    /// Human-readable title (underscores turned back into spaces).
    pub title: String,
    /// Extension without the dot, if any.
    pub extension: Option<String>,
}

/// Recover reference and title from a cache filename.
///
/// The stem is split at the first [`SEPARATOR`]. A stem with fewer than two
/// segments uses the whole stem as both reference and title.
///
/// # Examples
///
/// ```
/// use wallstash::cache::naming::parse_filename;
///
/// let parsed = parse_filename("abc_My_Wallpaper.png");
/// assert_eq!(parsed.reference, "abc");
/// assert_eq!(parsed.title, "My Wallpaper");
/// assert_eq!(parsed.extension.as_deref(), Some("png"));
///
/// let parsed = parse_filename("lonely.jpg");
/// assert_eq!(parsed.reference, "lonely");
/// assert_eq!(parsed.title, "lonely");
/// ```
pub fn parse_filename(file_name: &str) -> ParsedFilename {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext.to_string())),
        _ => (file_name, None),
    };

    match stem.split_once(SEPARATOR) {
        Some((reference, rest)) if !reference.is_empty() && !rest.is_empty() => ParsedFilename {
            reference: reference.to_string(),
            title: rest.replace(SEPARATOR, " "),
            extension,
        },
        _ => ParsedFilename {
            reference: stem.to_string(),
            title: stem.to_string(),
            extension,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_replaces_whitespace_and_unsafe() {
        assert_eq!(sanitize("Night\tCity"), "Night_City");
        assert_eq!(sanitize("a<b>c|d"), "a_b_c_d");
        assert_eq!(sanitize("  padded  "), "padded");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize("夕焼け 空"), "夕焼け_空");
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("PNG"), "png");
        assert_eq!(normalize_extension(".jpeg"), "jpeg");
        assert_eq!(normalize_extension(""), DEFAULT_EXTENSION);
    }

    #[test]
    fn test_cache_filename_prefixes_reference() {
        // Same display name, different references, different files
        let a = cache_filename("100", "Forest", "png");
        let b = cache_filename("200", "Forest", "png");
        assert_ne!(a, b);
        assert!(a.starts_with("100_"));
    }

    #[test]
    fn test_cache_filename_sanitizes_reference() {
        assert_eq!(cache_filename("a/b", "x", "png"), "a_b_x.png");
    }

    #[test]
    fn test_parse_filename_without_extension() {
        let parsed = parse_filename("abc_Title");
        assert_eq!(parsed.reference, "abc");
        assert_eq!(parsed.title, "Title");
        assert_eq!(parsed.extension, None);
    }

    #[test]
    fn test_parse_filename_trailing_separator() {
        let parsed = parse_filename("abc_.png");
        assert_eq!(parsed.reference, "abc_");
        assert_eq!(parsed.title, "abc_");
    }

    #[test]
    fn test_parse_filename_round_trip_title() {
        let name = cache_filename("def", "Other", "jpg");
        let parsed = parse_filename(&name);
        assert_eq!(parsed.reference, "def");
        assert_eq!(parsed.title, "Other");
    }

    proptest! {
        #[test]
        fn prop_sanitized_names_are_single_path_components(name in ".*") {
            let sanitized = sanitize(&name);
            prop_assert!(!sanitized.contains('/'));
            prop_assert!(!sanitized.contains('\\'));
            prop_assert!(!sanitized.chars().any(char::is_whitespace));
        }

        #[test]
        fn prop_reference_survives_parse(reference in "[A-Za-z0-9-]{1,16}", title in "[A-Za-z ]{0,24}") {
            let name = cache_filename(&reference, &title, "png");
            prop_assert_eq!(parse_filename(&name).reference, reference);
        }
    }
}
