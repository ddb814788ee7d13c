//! Text normalisation for messy "Title - Artist" lines.
//!
//! Everything here is pure string work: decoration stripping, artist
//! splitting, search-string folding and the heuristic that decides which side
//! of a `" - "` split is the title. The heuristics live in [`rules`] as named
//! tables so each one can be tested on its own.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use rules::{ARTIST_RULES, ARTIST_SEPARATOR, DECORATION_RULES, FEAT_RULE_NAMES, TITLE_RULES};

/// Which side of a `" - "` split holds the title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputOrder {
    /// Decide per line from the artist/title scores
    #[default]
    Auto,
    /// "Title - Artist"
    TitleFirst,
    /// "Artist - Title"
    ArtistFirst,
}

impl FromStr for InputOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "title-first" | "title" => Ok(Self::TitleFirst),
            "artist-first" | "artist" => Ok(Self::ArtistFirst),
            other => Err(format!(
                "unknown input order `{other}` (expected auto, title-first or artist-first)"
            )),
        }
    }
}

impl fmt::Display for InputOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::TitleFirst => "title-first",
            Self::ArtistFirst => "artist-first",
        })
    }
}

/// One parsed input line: the song the user wants.
///
/// Built once per line and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    pub raw_line: String,
    pub title: String,
    /// The artist text as written, possibly several joined artists
    pub artists: String,
    pub primary_artist: String,
}

impl TrackReference {
    pub fn parse(line: &str, order: InputOrder) -> Self {
        let trimmed = line.trim();
        let Some((title_text, artist_text)) = split_title_artist(trimmed, order) else {
            return Self {
                raw_line: trimmed.to_string(),
                title: strip_decorations(&strip_feat(trimmed)),
                artists: String::new(),
                primary_artist: String::new(),
            };
        };

        let artists = artist_text.trim().to_string();
        Self {
            raw_line: trimmed.to_string(),
            title: strip_decorations(&strip_feat(&title_text)),
            primary_artist: primary_artist(&artists),
            artists,
        }
    }
}

/// Split a line into `(title, artists)`, or `None` when there is no `" - "`.
///
/// Every cut between dash-separated segments is scored in both orientations.
/// An order hint fixes the orientation and only the cut is chosen; `Auto`
/// takes the best (cut, orientation) pair. When both orientations score the
/// same, the line is swapped only if its left side looks more like an artist
/// than its right side at the best title-first cut.
fn split_title_artist(line: &str, order: InputOrder) -> Option<(String, String)> {
    let segments: Vec<&str> = line.split(" - ").collect();
    if segments.len() < 2 {
        return None;
    }

    let splits: Vec<Split> = (0..segments.len() - 1)
        .map(|i| Split::at(&segments, i))
        .collect();
    let best_keep = best_split(&splits, |s| s.keep_score());
    let best_swap = best_split(&splits, |s| s.swap_score());

    let (split, swap) = match order {
        InputOrder::TitleFirst => (best_keep, false),
        InputOrder::ArtistFirst => (best_swap, true),
        InputOrder::Auto => {
            let (keep, swap) = (best_keep.keep_score(), best_swap.swap_score());
            if swap > keep {
                (best_swap, true)
            } else if swap < keep {
                (best_keep, false)
            } else {
                (best_keep, best_keep.left_artist > best_keep.right_artist)
            }
        }
    };

    let (left, right) = (split.left.clone(), split.right.clone());
    Some(if swap { (right, left) } else { (left, right) })
}

/// One cut of a dash-separated line with the scores of both sides.
struct Split {
    left: String,
    right: String,
    left_artist: i32,
    right_artist: i32,
    left_title: i32,
    right_title: i32,
}

impl Split {
    fn at(segments: &[&str], i: usize) -> Self {
        let left = segments[..=i].join(" - ").trim().to_string();
        let right = segments[i + 1..].join(" - ").trim().to_string();
        Self {
            left_artist: rules::score(&ARTIST_RULES, &left),
            right_artist: rules::score(&ARTIST_RULES, &right),
            left_title: rules::score(&TITLE_RULES, &left),
            right_title: rules::score(&TITLE_RULES, &right),
            left,
            right,
        }
    }

    /// "Title - Artist"
    fn keep_score(&self) -> i32 {
        self.left_title + self.right_artist
    }

    /// "Artist - Title"
    fn swap_score(&self) -> i32 {
        self.left_artist + self.right_title
    }
}

/// The first cut with the highest score.
fn best_split(splits: &[Split], score: impl Fn(&Split) -> i32) -> &Split {
    let mut best = &splits[0];
    for split in &splits[1..] {
        if score(split) > score(best) {
            best = split;
        }
    }
    best
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decompose and drop combining marks ("Beyoncé" -> "Beyonce").
pub fn fold_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Remove trailing decorations such as " - Remastered 2011", " - Radio Edit"
/// or a bracketed feat./live/remaster qualifier. Remix/VIP/Edit tokens stay.
pub fn strip_decorations(title: &str) -> String {
    let stripped = DECORATION_RULES
        .iter()
        .fold(title.to_string(), |acc, rule| rule.apply(&acc));
    collapse_whitespace(&stripped)
}

/// Remove a trailing bracketed feat./ft. clause and nothing else.
pub fn strip_feat(text: &str) -> String {
    let stripped = DECORATION_RULES
        .iter()
        .filter(|rule| FEAT_RULE_NAMES.contains(&rule.name))
        .fold(text.to_string(), |acc, rule| rule.apply(&acc));
    collapse_whitespace(&stripped)
}

/// Split a joined artist string into individual names.
pub fn split_artists(artists: &str) -> Vec<String> {
    ARTIST_SEPARATOR
        .split(artists)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first artist of a joined artist string.
pub fn primary_artist(artists: &str) -> String {
    split_artists(artists)
        .into_iter()
        .next()
        .unwrap_or_else(|| artists.trim().to_string())
}

/// Does the title look like a remix/edit variant?
pub fn looks_like_remix(title: &str) -> bool {
    rules::REMIX_WORD.is_match(title)
}

/// Fold a string into something search engines handle well.
///
/// Diacritics are dropped, curly quotes become straight ones and punctuation
/// other than quotes, apostrophes, `.`, `&`, `+` and `-` becomes a space.
pub fn normalise_for_search(s: &str) -> String {
    static PUNCTUATION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[^\w\s"'.&+-]"#).expect("punctuation pattern is valid"));

    let folded: String = fold_diacritics(s)
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect();
    collapse_whitespace(&PUNCTUATION.replace_all(&folded, " "))
}
