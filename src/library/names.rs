//! Naming rules for the organised library.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{collapse_whitespace, normalise_for_search};

/// Replace characters that are illegal in file names on common filesystems.
///
/// Control characters are dropped, runs of `\ / : " < > ? | *` become a single
/// `_` and whitespace is collapsed. An empty result becomes "Unknown".
pub fn sanitize_name(name: &str) -> String {
    static ILLEGAL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[\\/:"<>?|*]+"#).expect("illegal-char pattern is valid"));

    let no_control: String = name.chars().filter(|c| !c.is_control()).collect();
    let cleaned = collapse_whitespace(&ILLEGAL.replace_all(&no_control, "_"));
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

/// Choose one genre from a multi-valued genre tag.
///
/// Any "Drum & Bass" value wins outright. Otherwise a leading generic
/// "Electronic" is skipped in favour of the next, more specific value.
pub fn pick_genre(raw: &str) -> String {
    let parts: Vec<&str> = raw
        .split([',', ';', '|', '/'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let norm = |s: &str| normalise_for_search(s).to_lowercase();

    if parts.iter().any(|p| norm(p).contains("drum & bass")) {
        return "Drum & Bass".to_string();
    }
    if parts.len() > 1 && matches!(norm(parts[0]).as_str(), "electronic" | "electronique") {
        return parts[1].to_string();
    }
    parts
        .first()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("AC/DC"), "AC_DC");
        assert_eq!(sanitize_name("Track: Title"), "Track_ Title");
        assert_eq!(sanitize_name("Valid Name"), "Valid Name");
        assert_eq!(sanitize_name("Artist?"), "Artist_");
        assert_eq!(sanitize_name("a<b>c"), "a_b_c");
        assert_eq!(sanitize_name("what?!*"), "what_!_");
        assert_eq!(sanitize_name("  tabs\tand\nnewlines "), "tabsandnewlines");
        assert_eq!(sanitize_name(""), "Unknown");
    }

    #[test]
    fn test_pick_genre_prefers_drum_and_bass() {
        assert_eq!(pick_genre("Electronic, Drum & Bass"), "Drum & Bass");
        assert_eq!(pick_genre("Dance; drum & bass; Jungle"), "Drum & Bass");
    }

    #[test]
    fn test_pick_genre_skips_leading_electronic() {
        assert_eq!(pick_genre("Electronic/Dubstep"), "Dubstep");
        assert_eq!(pick_genre("Électronique, House"), "House");
        assert_eq!(pick_genre("Electronic"), "Electronic");
    }

    #[test]
    fn test_pick_genre_fallbacks() {
        assert_eq!(pick_genre("Jungle | Breakbeat"), "Jungle");
        assert_eq!(pick_genre(""), "Unknown");
        assert_eq!(pick_genre(" , ; "), "Unknown");
    }
}
