//! Named heuristic rules used by the normaliser.
//!
//! Every rule has a stable name so tests (and debug logging) can target a
//! single rule. Tables are evaluated in declaration order.

use regex::Regex;
use std::sync::LazyLock;

/// A regex rewrite that deletes whatever it matches.
pub struct RewriteRule {
    pub name: &'static str,
    pattern: Regex,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("rewrite rule pattern is valid"),
        }
    }

    /// Remove the first match of this rule from `input`.
    pub fn apply(&self, input: &str) -> String {
        self.pattern.replace(input, "").into_owned()
    }

    pub fn matches(&self, input: &str) -> bool {
        self.pattern.is_match(input)
    }
}

enum Matcher {
    Pattern(Regex),
    Predicate(fn(&str) -> bool),
}

/// A weighted yes/no heuristic contributing to an artist or title score.
pub struct ScoreRule {
    pub name: &'static str,
    pub weight: i32,
    matcher: Matcher,
}

impl ScoreRule {
    fn pattern(name: &'static str, weight: i32, pattern: &str) -> Self {
        Self {
            name,
            weight,
            matcher: Matcher::Pattern(Regex::new(pattern).expect("score rule pattern is valid")),
        }
    }

    fn predicate(name: &'static str, weight: i32, test: fn(&str) -> bool) -> Self {
        Self {
            name,
            weight,
            matcher: Matcher::Predicate(test),
        }
    }

    pub fn applies(&self, input: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(re) => re.is_match(input),
            Matcher::Predicate(test) => test(input),
        }
    }
}

/// Trailing decorations removed from titles, highest priority first.
///
/// All rules are anchored at the end of the string so words such as
/// "Leftfield" or "Alive" in the middle of a title are never touched.
pub static DECORATION_RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        RewriteRule::new(
            "dash_suffix",
            r"(?i)\s+-\s*(?:remaster(?:ed)?(?:\s*\d{2,4})?|mono|stereo|live|demo|radio edit|single edit|album version)\b.*$",
        ),
        RewriteRule::new("feat_paren", r"(?i)\s*\((?:feat\.?|ft\.?)\s+[^)]+\)\s*$"),
        RewriteRule::new("feat_square", r"(?i)\s*\[(?:feat\.?|ft\.?)\s+[^\]]+\]\s*$"),
        RewriteRule::new(
            "live_remaster_paren",
            r"(?i)\s*\([^()]*\b(?:remaster(?:ed)?|live)\b[^()]*\)\s*$",
        ),
        RewriteRule::new(
            "live_remaster_square",
            r"(?i)\s*\[[^\[\]]*\b(?:remaster(?:ed)?|live)\b[^\[\]]*\]\s*$",
        ),
    ]
});

/// Names of the decoration rules that only deal with featured artists.
pub const FEAT_RULE_NAMES: &[&str] = &["feat_paren", "feat_square"];

/// Look up a decoration rule by name.
pub fn decoration_rule(name: &str) -> Option<&'static RewriteRule> {
    DECORATION_RULES.iter().find(|r| r.name == name)
}

/// Separators between artists in a joined artist string.
///
/// `&` is deliberately absent ("Chase & Status") and `x` only splits when
/// surrounded by whitespace.
pub static ARTIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s*|\s+x\s+|\s*×\s*|\s+\band\s+").expect("separator pattern is valid")
});

/// Vocabulary marking a remix/version variant of a track.
pub static REMIX_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:remix|vip|edit|bootleg)\b").expect("remix pattern is valid")
});

/// Vocabulary accepted inside a bracketed qualifier (library names, tags).
pub static QUALIFIER_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:remix|vip|edit|mix|version)\b").expect("qualifier pattern is valid")
});

fn all_words_capitalised(input: &str) -> bool {
    static CAPITALISED: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Z][\w'.-]*$").expect("capitalised pattern is valid"));
    let words: Vec<&str> = input.split_whitespace().collect();
    (1..=4).contains(&words.len()) && words.iter().all(|w| CAPITALISED.is_match(w))
}

/// Evidence that a side of a `" - "` split is an artist.
pub static ARTIST_RULES: LazyLock<Vec<ScoreRule>> = LazyLock::new(|| {
    vec![
        ScoreRule::pattern(
            "joiner",
            2,
            r"(?i),|\s&\s|\sx\s|\s×\s|\sand\s|\sft\.?|\sfeat\.?|\svs\s|\spres\.?",
        ),
        ScoreRule::predicate("capitalised_words", 1, all_words_capitalised),
        ScoreRule::pattern("honorific", 1, r"(?i)^\s*(?:dj|mc|mr|mrs|ms)\b"),
    ]
});

/// Evidence that a side of a `" - "` split is a title.
pub static TITLE_RULES: LazyLock<Vec<ScoreRule>> = LazyLock::new(|| {
    vec![
        ScoreRule::pattern("digits", 1, r"\d"),
        ScoreRule::pattern("brackets", 1, r"[(\[]"),
        ScoreRule::pattern(
            "version_vocabulary",
            2,
            r"(?i)remix|edit|mix|dub|version|vip|bootleg|refix|rework|instrumental|original|extended|intro|outro",
        ),
        ScoreRule::pattern("series_marker", 1, r"(?i)\b(?:part|pt\.?|vol\.?|chapter|episode)\b"),
    ]
});

/// Sum the weights of every rule in `rules` that applies to `input`.
pub fn score(rules: &[ScoreRule], input: &str) -> i32 {
    if input.trim().is_empty() {
        return 0;
    }
    rules
        .iter()
        .filter(|rule| rule.applies(input))
        .map(|rule| rule.weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist_rule(name: &str) -> &'static ScoreRule {
        ARTIST_RULES.iter().find(|r| r.name == name).unwrap()
    }

    fn title_rule(name: &str) -> &'static ScoreRule {
        TITLE_RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn dash_suffix_removes_trailing_remaster() {
        let rule = decoration_rule("dash_suffix").unwrap();
        assert_eq!(rule.apply("Heroes - Remastered 2011"), "Heroes");
        assert_eq!(rule.apply("Heroes - Radio Edit"), "Heroes");
        assert_eq!(rule.apply("The Leftfield"), "The Leftfield");
    }

    #[test]
    fn feat_rules_only_strip_trailing_brackets() {
        let paren = decoration_rule("feat_paren").unwrap();
        let square = decoration_rule("feat_square").unwrap();
        assert_eq!(paren.apply("Tune (feat. Someone)"), "Tune");
        assert_eq!(square.apply("Tune [ft. Someone]"), "Tune");
        assert_eq!(paren.apply("Left (feat. A) Right"), "Left (feat. A) Right");
    }

    #[test]
    fn live_remaster_rules_keep_remix_qualifiers() {
        let paren = decoration_rule("live_remaster_paren").unwrap();
        assert_eq!(paren.apply("Song (Live at Brixton)"), "Song");
        assert_eq!(paren.apply("Song (2011 Remaster)"), "Song");
        assert_eq!(paren.apply("Song (Sub Focus Remix)"), "Song (Sub Focus Remix)");
        assert_eq!(paren.apply("Song (Live) (VIP)"), "Song (Live) (VIP)");
        let square = decoration_rule("live_remaster_square").unwrap();
        assert_eq!(square.apply("Song [Live]"), "Song");
    }

    #[test]
    fn artist_separator_ignores_ampersand_and_inner_x() {
        let parts: Vec<&str> = ARTIST_SEPARATOR.split("Chase & Status, Xeno x Alix").collect();
        assert_eq!(parts, vec!["Chase & Status", "Xeno", "Alix"]);
    }

    #[test]
    fn artist_rules_score_independently() {
        assert!(artist_rule("joiner").applies("Cesco, Sparkz"));
        assert!(artist_rule("joiner").applies("Sub Focus vs Wilkinson"));
        assert!(!artist_rule("joiner").applies("Cesco"));
        assert!(artist_rule("capitalised_words").applies("Virus Syndicate"));
        assert!(!artist_rule("capitalised_words").applies("when i'm on"));
        assert!(!artist_rule("capitalised_words").applies("One Two Three Four Five"));
        assert!(artist_rule("honorific").applies("DJ Hype"));
        assert!(!artist_rule("honorific").applies("Djembe Song"));
    }

    #[test]
    fn title_rules_score_independently() {
        assert!(title_rule("digits").applies("Track 2"));
        assert!(title_rule("brackets").applies("Tune (VIP)"));
        assert!(title_rule("version_vocabulary").applies("Tune Remix"));
        assert!(title_rule("series_marker").applies("Journey Pt. 2"));
        assert!(title_rule("series_marker").applies("Vol 3"));
        assert!(!title_rule("series_marker").applies("Partisan"));
    }

    #[test]
    fn score_sums_weights() {
        assert_eq!(score(&ARTIST_RULES, "Cesco, Sparkz"), 2);
        assert_eq!(score(&ARTIST_RULES, "DJ Hype"), 2);
        assert_eq!(score(&TITLE_RULES, "Tune (VIP Mix) 2"), 4);
        assert_eq!(score(&TITLE_RULES, ""), 0);
    }
}
