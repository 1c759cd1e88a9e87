//! Fuzzy string scoring on a 0-100 scale.
//!
//! All scorers are built on `strsim::normalized_levenshtein` over a
//! normalised form of the input (lowercase, non-alphanumerics folded to
//! spaces, whitespace collapsed). The token variants follow the usual
//! "sort" and "set" constructions:
//!
//! ```text
//! token_sort_ratio(a, b) = ratio(sorted_tokens(a), sorted_tokens(b))
//!
//! token_set_ratio(a, b):
//!     t0 = sorted(a ∩ b)
//!     t1 = t0 + sorted(a \ b)
//!     t2 = t0 + sorted(b \ a)
//!     max(ratio(t0, t1), ratio(t0, t2), ratio(t1, t2))
//! ```

use std::collections::BTreeSet;

/// Minimum full-name similarity for a player match.
pub const PLAYER_MATCH_THRESHOLD: u8 = 80;

/// Minimum similarity for team, position and statistic fuzzy matches.
pub const FUZZY_MATCH_THRESHOLD: u8 = 85;

/// `true` when `score` clears `threshold` (inclusive).
#[inline]
pub fn passes(score: u8, threshold: u8) -> bool {
    score >= threshold
}

/// Lowercase, fold punctuation to whitespace, collapse runs of whitespace.
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokens(s: &str) -> Vec<String> {
    normalize(s).split_whitespace().map(str::to_string).collect()
}

fn raw_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Edit-distance similarity of the normalised strings.
pub fn ratio(a: &str, b: &str) -> u8 {
    raw_ratio(&normalize(a), &normalize(b))
}

/// Best `ratio` of the shorter string against every equally long window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.is_empty() {
        return 0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    let mut best = 0;
    for start in 0..=(long_chars.len() - width) {
        let window: String = long_chars[start..start + width].iter().collect();
        best = best.max(raw_ratio(&short, &window));
        if best == 100 {
            break;
        }
    }
    best
}

pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    raw_ratio(&sorted_join(a), &sorted_join(b))
}

pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let sa: BTreeSet<String> = tokens(a).into_iter().collect();
    let sb: BTreeSet<String> = tokens(b).into_iter().collect();

    let sect = join(sa.intersection(&sb));
    let diff_ab = join(sa.difference(&sb));
    let diff_ba = join(sb.difference(&sa));

    let t1 = concat(&sect, &diff_ab);
    let t2 = concat(&sect, &diff_ba);

    raw_ratio(&sect, &t1)
        .max(raw_ratio(&sect, &t2))
        .max(raw_ratio(&t1, &t2))
}

/// Best `token_set_ratio` of `needle` against the whole of `haystack` and
/// against every run of consecutive haystack tokens as long as the needle.
pub fn best_window_score(needle: &str, haystack: &str) -> u8 {
    let width = tokens(needle).len().max(1);
    let hay = tokens(haystack);
    let mut best = token_set_ratio(needle, haystack);
    if hay.len() > width {
        for window in hay.windows(width) {
            best = best.max(token_set_ratio(needle, &window.join(" ")));
            if best == 100 {
                break;
            }
        }
    }
    best
}

fn sorted_join(s: &str) -> String {
    let mut t = tokens(s);
    t.sort();
    t.join(" ")
}

fn join<'a>(it: impl Iterator<Item = &'a String>) -> String {
    it.map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}
