//! Curated genre → tag mapping.
//!
//! Only genres listed in [`TAG_ALLOWLIST`] become post tags; everything else
//! is dropped on purpose so the tag cloud stays small.
use std::collections::HashMap;
use std::sync::OnceLock;

use itertools::Itertools;

use crate::sheet::record::split_list;

/// `(genre as it appears in the sheet, canonical tag name)`.
pub const TAG_ALLOWLIST: &[(&str, &str)] = &[
    ("素人", "素人"),
    ("フェラ", "フェラ"),
    ("人妻・主婦", "人妻"),
    ("人妻", "人妻"),
    ("熟女", "熟女"),
    ("美少女", "美少女"),
    ("巨乳", "巨乳"),
    ("単体作品", "単体作品"),
    ("企画", "企画"),
    ("ドキュメンタリー", "ドキュメンタリー"),
    ("コスプレ", "コスプレ"),
    ("ギャル", "ギャル"),
    ("OL", "OL"),
    ("VR", "VR"),
    ("VR専用", "VR"),
    ("4K", "4K"),
    ("ハイビジョン", "ハイビジョン"),
    ("独占配信", "独占配信"),
    ("デビュー作品", "デビュー作品"),
    ("ベスト・総集編", "総集編"),
];

struct Lookup {
    exact: HashMap<&'static str, &'static str>,
    folded: HashMap<String, &'static str>,
}

fn lookup() -> &'static Lookup {
    static LOOKUP: OnceLock<Lookup> = OnceLock::new();
    LOOKUP.get_or_init(|| Lookup {
        exact: TAG_ALLOWLIST.iter().copied().collect(),
        folded: TAG_ALLOWLIST
            .iter()
            .map(|(genre, tag)| (genre.to_lowercase(), *tag))
            .collect(),
    })
}

/// Canonical tag for one genre: exact match first, then case-insensitive.
pub fn canonical_tag(genre: &str) -> Option<&'static str> {
    let genre = genre.trim();
    let table = lookup();
    table
        .exact
        .get(genre)
        .or_else(|| table.folded.get(&genre.to_lowercase()))
        .copied()
}

/// Map a comma-separated genre list to at most `max_tags` distinct tag names,
/// in first-seen order.
pub fn map_tags(genres: &str, max_tags: usize) -> Vec<String> {
    split_list(genres)
        .into_iter()
        .filter_map(canonical_tag)
        .unique()
        .take(max_tags)
        .map(str::to_string)
        .collect()
}
