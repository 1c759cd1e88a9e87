//! Keyword fallback for intent selection.
//!
//! Used when no external classifier supplies intents. Rules are checked in
//! order; each contributes template ids that the resolved entities can
//! actually fill where possible. The result is capped at
//! [`MAX_LOCAL_INTENTS`] and never empty.

use tracing::debug;

use fplgraph_entities::fuzz::normalize;
use fplgraph_entities::EntityBag;

pub const MAX_LOCAL_INTENTS: usize = 3;

pub const FALLBACK_INTENT: &str = "PLAYER_CAREER_STATS_TOTALS";

const RECOMMEND_WORDS: &[&str] = &["captain", "recommend", "suggest", "transfer", "transfers"];
const COMPARE_WORDS: &[&str] = &["compare", "better", "vs", "versus"];
const OPPONENT_WORDS: &[&str] = &["fixture", "fixtures", "playing", "next", "opponent", "opponents"];
const STATS_WORDS: &[&str] = &["points", "goals", "assists", "stats", "how many"];
const LEADER_WORDS: &[&str] = &["top", "best", "most", "leaders", "highest"];
const VALUE_WORDS: &[&str] = &["budget", "cheap", "value", "under"];

/// Up to three template ids for `text`, most specific first.
pub fn classify_local(text: &str, bag: &EntityBag) -> Vec<&'static str> {
    let norm = format!(" {} ", normalize(text));
    let mentions = |words: &[&str]| words.iter().any(|w| norm.contains(&format!(" {w} ")));

    let has_player = !bag.players.is_empty();
    let has_stat = !bag.statistics.is_empty();
    let mut out: Vec<&'static str> = Vec::new();
    let mut push = |id: &'static str| push_unique(&mut out, id);

    if mentions(RECOMMEND_WORDS) {
        if has_player {
            push("PLAYER_POINTS_PER_MINUTE_SPECIFIC_SEASON");
        } else if mentions(VALUE_WORDS) || bag.has_stated_budget() {
            push("BEST_VALUE_PLAYERS_UNDER_BUDGET");
            push("POINTS_PER_MINUTE_LEADERS");
        } else {
            push("POINTS_PER_MINUTE_LEADERS");
        }
    }

    if mentions(COMPARE_WORDS) && bag.players.len() >= 2 {
        if has_stat {
            push("COMPARE_PLAYERS_BY_SPECIFIC_STAT_TOTAL_ALL_TIME");
        }
        push("COMPARE_PLAYERS_BY_TOTAL_POINTS");
    }

    if mentions(OPPONENT_WORDS) && has_player {
        push("PLAYER_BEST_PERFORMANCE_AGAINST_WHICH_OPPONENTS");
    }

    if has_player && !bag.teams.is_empty() {
        push("PLAYER_POINTS_VS_SPECIFIC_TEAM");
        if has_stat {
            push("PLAYER_SPECIFIC_STAT_VS_SPECIFIC_TEAM");
        }
    }

    if mentions(STATS_WORDS) && has_player {
        if has_stat {
            push("PLAYER_SPECIFIC_STAT_SUM");
        }
        push("PLAYER_CAREER_STATS_TOTALS");
    }

    if mentions(LEADER_WORDS) && !has_player {
        if !bag.positions.is_empty() {
            if has_stat {
                push("TOP_SUM_OF_SPECIFIC_STAT_LEADERS_SPECIFIC_POSITION");
            }
            push("TOP_PLAYERS_BY_POSITION_IN_POINTS");
        } else if has_stat {
            push("TOP_PLAYERS_BY_STAT");
        }
    }

    if out.is_empty() {
        out.push(FALLBACK_INTENT);
    }
    out.truncate(MAX_LOCAL_INTENTS);
    debug!(intents = ?out, "local intent fallback");
    out
}

fn push_unique(out: &mut Vec<&'static str>, id: &'static str) {
    if !out.contains(&id) {
        out.push(id);
    }
}
