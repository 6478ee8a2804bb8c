//! Label vocabularies mapping upstream class names onto pipeline categories
//!
//! Hosted models disagree on naming (`tree`, `tree-merged`, `palm_tree`,
//! `forest fire`). Labels are normalised, split into alphabetic tokens and
//! matched against keyword lists in a fixed priority order: fire and smoke
//! first so `forest fire` never reads as trees, then structures, then
//! vegetation.
//!
//! Matching is per token, with a plural allowance, so `fireplace` and
//! `remember` never read as fire. Objects named after fire (`fire hydrant`,
//! `fire engine`) are excluded explicitly.

use super::SegmentCategory;

const FIRE_KEYWORDS: &[&str] = &[
    "fire",
    "flame",
    "blaze",
    "burning",
    "wildfire",
    "bushfire",
    "forestfire",
    "campfire",
    "bonfire",
    "firestorm",
    "inferno",
    "ember",
];

/// Tokens that turn a preceding fire keyword into an object name
const FIRE_OBJECTS: &[&str] = &[
    "hydrant",
    "place",
    "engine",
    "truck",
    "screen",
    "guard",
    "escape",
    "extinguisher",
    "station",
    "boat",
    "alarm",
    "door",
    "exit",
];

const SMOKE_KEYWORDS: &[&str] = &["smoke", "haze", "smog", "ash cloud"];

const STRUCTURE_KEYWORDS: &[&str] = &[
    "house",
    "building",
    "wall",
    "roof",
    "fence",
    "shed",
    "barn",
    "skyscraper",
    "cabin",
    "hut",
    "garage",
    "home",
    "tower",
];

const TREE_KEYWORDS: &[&str] = &[
    "tree", "forest", "palm", "pine", "oak", "woodland", "canopy", "jungle",
];

const SHRUB_KEYWORDS: &[&str] = &[
    "shrub",
    "bush",
    "plant",
    "flower",
    "hedge",
    "brush",
    "chaparral",
    "scrub",
];

const GRASS_KEYWORDS: &[&str] = &[
    "grass",
    "field",
    "playingfield",
    "meadow",
    "lawn",
    "hay",
    "prairie",
    "savanna",
    "pasture",
];

const NEGATIONS: &[&str] = &["no", "non", "not", "without"];

/// Lower-case a label and strip panoptic suffixes and separators
pub fn normalize_label(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    let stripped = ["-merged", "-other", "-stuff"]
        .iter()
        .fold(lower, |acc, suffix| {
            acc.strip_suffix(suffix).map(str::to_string).unwrap_or(acc)
        });
    stripped.replace(['_', '-'], " ")
}

fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .collect()
}

fn token_matches(token: &str, word: &str) -> bool {
    token == word
        || token.strip_suffix('s') == Some(word)
        || token.strip_suffix("es") == Some(word)
}

/// Token index just past each occurrence of a (possibly multi-word) keyword
fn keyword_ends<'a>(
    tokens: &'a [&'a str],
    keyword: &'a str,
) -> impl Iterator<Item = usize> + 'a {
    let words: Vec<&str> = keyword.split(' ').collect();
    let len = words.len();
    tokens
        .windows(len)
        .enumerate()
        .filter(move |(_, window)| window.iter().zip(&words).all(|(t, w)| token_matches(t, w)))
        .map(move |(start, _)| start + len)
}

fn matches_any(tokens: &[&str], keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|keyword| keyword_ends(tokens, keyword).next().is_some())
}

fn mentions_fire(tokens: &[&str]) -> bool {
    FIRE_KEYWORDS.iter().any(|keyword| {
        keyword_ends(tokens, keyword).any(|end| {
            !tokens
                .get(end)
                .is_some_and(|next| FIRE_OBJECTS.iter().any(|object| token_matches(next, object)))
        })
    })
}

/// True when free text contains any keyword as a whole word
pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let normalized = normalize_label(text);
    matches_any(&tokens(&normalized), keywords)
}

/// True when a label's leading word denies its subject (`no fire`)
fn is_negated(tokens: &[&str]) -> bool {
    tokens.first().is_some_and(|first| NEGATIONS.contains(first))
}

/// Fire or smoke named by a label or free-text hint, fire first
///
/// Returns only [`SegmentCategory::Fire`] or [`SegmentCategory::Smoke`].
pub fn fire_signal(label: &str) -> Option<SegmentCategory> {
    let normalized = normalize_label(label);
    let tokens = tokens(&normalized);
    if tokens.is_empty() || is_negated(&tokens) {
        None
    } else if mentions_fire(&tokens) {
        Some(SegmentCategory::Fire)
    } else if matches_any(&tokens, SMOKE_KEYWORDS) {
        Some(SegmentCategory::Smoke)
    } else {
        None
    }
}

/// Map an upstream label onto a category, or `None` if it is irrelevant
pub fn categorize(label: &str) -> Option<SegmentCategory> {
    let normalized = normalize_label(label);
    let tokens = tokens(&normalized);
    if tokens.is_empty() || is_negated(&tokens) {
        return None;
    }

    if mentions_fire(&tokens) {
        Some(SegmentCategory::Fire)
    } else if matches_any(&tokens, SMOKE_KEYWORDS) {
        Some(SegmentCategory::Smoke)
    } else if matches_any(&tokens, STRUCTURE_KEYWORDS) {
        Some(SegmentCategory::Structures)
    } else if matches_any(&tokens, TREE_KEYWORDS) {
        Some(SegmentCategory::Trees)
    } else if matches_any(&tokens, SHRUB_KEYWORDS) {
        Some(SegmentCategory::Shrubs)
    } else if matches_any(&tokens, GRASS_KEYWORDS) {
        Some(SegmentCategory::Grass)
    } else {
        None
    }
}
