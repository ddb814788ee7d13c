//! Search-query candidates for a track reference.
//!
//! Candidates run from tight (artist plus exact quoted title) to loose (the
//! bare title). The resolver tries them in order, so the order is the
//! priority.

use std::collections::HashSet;

use crate::normalize::{TrackReference, looks_like_remix, normalise_for_search, split_artists, strip_feat};

/// Build the ordered, de-duplicated candidate list for `track`.
///
/// Never empty when the title is non-empty: the bare title is always the
/// last candidate.
pub fn build_queries(track: &TrackReference) -> Vec<String> {
    let title = strip_feat(&track.title);
    let primary = track.primary_artist.as_str();
    let artist_list = split_artists(&track.artists);

    let mut queries = vec![
        // Artist-first, exact phrase then loose
        format!("{primary} \"{title}\""),
        normalise_for_search(&format!("{primary} {title}")),
        // Title-first, loose then exact phrase
        normalise_for_search(&format!("{title} {primary}")),
        normalise_for_search(&format!("\"{title}\" {primary}")),
        normalise_for_search(&format!("\"{title}\"")),
    ];

    if (2..=3).contains(&artist_list.len()) {
        queries.push(normalise_for_search(&format!(
            "{title} {}",
            artist_list.join(" ")
        )));
    }

    if looks_like_remix(&track.title) {
        queries.push(normalise_for_search(&format!("\"{}\" {primary}", track.title)));
        queries.push(normalise_for_search(&format!("\"{title}\" {primary} remix")));
    }

    queries.push(normalise_for_search(&title));

    dedupe(queries)
}

/// Trim, drop empties and keep the first occurrence of each query.
fn dedupe(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && q != "\"\"")
        .filter(|q| seen.insert(q.clone()))
        .collect()
}
