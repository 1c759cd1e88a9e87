//! Utterance → [`EntityBag`].
//!
//! Each category has its own extractor. Extractors never fail: a category
//! that matches nothing is simply empty, and one category never influences
//! another. Categories are filled in a fixed order (gameweeks, positions,
//! teams, players, seasons, statistics, budget).
//!
//! ```text
//!   "How many goals did Salah score against Wolves"
//!        │
//!        ├── gameweeks   regex  (gw|gameweek|week|round|matchday) N
//!        ├── positions   variant substring, else windowed token-set ≥ 85
//!        ├── teams       abbreviations ∪ org spans (token-sort ≥ 85) ∪ containment
//!        ├── players     full-name token-set ≥ 80, then standalone name tokens
//!        ├── seasons     season regex, else bare-year table
//!        ├── statistics  short variants by word, long by substring/fuzzy
//!        └── budget      D.D, else 6.0
//! ```

use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::bag::{push_unique, EntityBag, DEFAULT_BUDGET};
use crate::fuzz::{self, FUZZY_MATCH_THRESHOLD, PLAYER_MATCH_THRESHOLD};
use crate::kinds::{Position, Season, StatKey};
use crate::tagger::{CapitalizedSpanTagger, OrgTagger};
use crate::vocabulary::Vocabulary;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Common abbreviations and nicknames, lowercase, mapped to full team names.
const TEAM_ALIASES: &[(&str, &[&str])] = &[
    ("Arsenal", &["ars", "gunners"]),
    ("Aston Villa", &["avl", "villa"]),
    ("Bournemouth", &["bou", "cherries"]),
    ("Brentford", &["bre", "bees"]),
    ("Brighton & Hove Albion", &["bha", "brighton", "seagulls"]),
    ("Burnley", &["bur", "clarets"]),
    ("Chelsea", &["che"]),
    ("Crystal Palace", &["cry", "palace"]),
    ("Everton", &["evt", "toffees"]),
    ("Fulham", &["ful"]),
    ("Leeds United", &["lee", "leeds"]),
    ("Leicester City", &["lei", "leicester", "foxes"]),
    ("Liverpool", &["liv"]),
    ("Manchester City", &["mci", "man city"]),
    ("Manchester United", &["mun", "man utd", "man united"]),
    ("Newcastle United", &["newcastle", "toon", "magpies"]),
    ("Norwich City", &["nor", "norwich"]),
    ("Nottingham Forest", &["nfo", "forest", "nott'm forest"]),
    ("Southampton", &["sou", "saints"]),
    ("Tottenham Hotspur", &["tot", "spurs", "tottenham"]),
    ("Watford", &["wat"]),
    ("West Ham United", &["whu", "west ham", "hammers"]),
    ("Wolverhampton Wanderers", &["wol", "wolves"]),
];

/// Stat names that also occur inside everyday words ("performance").
const WHOLE_WORD_VARIANTS: &[&str] = &["form"];

/// Name tokens too common in questions to identify a player on their own.
const COMMON_WORDS: &[&str] = &[
    "the", "and", "for", "with", "how", "many", "much", "did", "does", "has", "have", "had",
    "who", "what", "which", "best", "top", "most", "all", "show", "compare", "score", "scored",
    "goal", "goals", "point", "points", "player", "players", "team", "teams", "game", "week",
    "season", "against", "from", "over", "under", "his", "her", "their", "will", "may", "max",
    "king", "young", "white", "love", "city", "united", "form", "value", "price", "bench",
];

/// Turns free text into an [`EntityBag`].
pub struct EntityResolver {
    tagger: Box<dyn OrgTagger>,
    gameweek: Regex,
    budget: Regex,
    bare_year: Regex,
    seasons: Vec<(Season, Regex)>,
    team_aliases: Vec<(&'static str, Regex)>,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver").finish_non_exhaustive()
    }
}

impl EntityResolver {
    pub fn new() -> Result<Self, ResolverError> {
        Self::with_tagger(CapitalizedSpanTagger)
    }

    pub fn with_tagger(tagger: impl OrgTagger + 'static) -> Result<Self, ResolverError> {
        let seasons = Season::ALL
            .into_iter()
            .map(|season| -> Result<(Season, Regex), regex::Error> {
                let start = season.start_yy();
                let pattern = format!(r"\b(?:20)?{start}[-/ ]?(?:20)?{}\b", start + 1);
                Ok((season, Regex::new(&pattern)?))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let team_aliases = TEAM_ALIASES
            .iter()
            .map(|(team, aliases)| -> Result<(&'static str, Regex), regex::Error> {
                let alternation = aliases
                    .iter()
                    .map(|a| regex::escape(a))
                    .collect::<Vec<_>>()
                    .join("|");
                Ok((*team, Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))?))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            tagger: Box::new(tagger),
            gameweek: Regex::new(
                r"(?i)\b(?:game\s?weeks?|gws?|weeks?|round|matchday)\s*(\d{1,2})\b",
            )?,
            budget: Regex::new(r"\b(\d{1,2}\.\d)\b")?,
            bare_year: Regex::new(r"\b(20\d{2}|\d{2})\b")?,
            seasons,
            team_aliases,
        })
    }

    /// Run every extractor over `text`.
    pub fn resolve(&self, text: &str, vocab: &Vocabulary) -> EntityBag {
        let bag = EntityBag {
            gameweeks: self.extract_gameweeks(text),
            positions: self.extract_positions(text),
            teams: self.extract_teams(text, &vocab.teams),
            players: self.extract_players(text, &vocab.players),
            seasons: self.extract_seasons(text),
            statistics: self.extract_statistics(text),
            budget: self.extract_budget(text),
        };
        debug!(?bag, "entities resolved");
        bag
    }

    pub fn extract_gameweeks(&self, text: &str) -> Vec<u32> {
        let mut out = Vec::new();
        for caps in self.gameweek.captures_iter(text) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                push_unique(&mut out, n);
            }
        }
        out
    }

    pub fn extract_positions(&self, text: &str) -> Vec<Position> {
        let lower = text.to_lowercase();
        let mut out = Vec::new();
        for position in Position::ALL {
            let hit = position.variants().iter().any(|variant| {
                lower.contains(variant)
                    || fuzz::passes(fuzz::best_window_score(variant, &lower), FUZZY_MATCH_THRESHOLD)
            });
            if hit {
                push_unique(&mut out, position);
            }
        }
        out
    }

    /// Abbreviations, then organisation spans, then plain containment.
    pub fn extract_teams(&self, text: &str, teams: &[String]) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut out = Vec::new();

        let mut by_alias: Vec<(usize, &str)> = self
            .team_aliases
            .iter()
            .filter_map(|(team, re)| re.find(text).map(|m| (m.start(), *team)))
            .collect();
        by_alias.sort_by_key(|(pos, _)| *pos);
        for (_, team) in by_alias {
            push_unique(&mut out, team.to_string());
        }

        for span in self.tagger.org_spans(text) {
            let best = teams
                .iter()
                .map(|team| (fuzz::token_sort_ratio(&span, team), team))
                .fold(None::<(u8, &String)>, |best, cand| match best {
                    Some(b) if b.0 >= cand.0 => Some(b),
                    _ => Some(cand),
                });
            if let Some((score, team)) = best {
                if fuzz::passes(score, FUZZY_MATCH_THRESHOLD) {
                    push_unique(&mut out, team.clone());
                }
            }
        }

        let mut contained: Vec<(usize, &String)> = teams
            .iter()
            .filter(|team| !team.trim().is_empty())
            .filter_map(|team| lower.find(&team.to_lowercase()).map(|pos| (pos, team)))
            .collect();
        contained.sort_by_key(|(pos, _)| *pos);
        for (_, team) in contained {
            push_unique(&mut out, team.clone());
        }

        out
    }

    /// Best-scoring player names, highest score first.
    pub fn extract_players(&self, text: &str, players: &[String]) -> Vec<String> {
        let mut scored: Vec<(&String, u8)> = players
            .iter()
            .map(|name| (name, fuzz::token_set_ratio(name, text)))
            .filter(|(_, score)| fuzz::passes(*score, PLAYER_MATCH_THRESHOLD))
            .collect();

        if scored.len() < 2 {
            let words: HashSet<String> = fuzz::tokens(text).into_iter().collect();
            let claimed: HashSet<String> = scored
                .iter()
                .flat_map(|(name, _)| fuzz::tokens(name))
                .collect();

            for name in players {
                if scored.iter().any(|(n, _)| *n == name) {
                    continue;
                }
                let best = fuzz::tokens(name)
                    .into_iter()
                    .filter(|t| t.chars().count() >= 3)
                    .filter(|t| !COMMON_WORDS.contains(&t.as_str()))
                    .filter(|t| !claimed.contains(t) && words.contains(t))
                    .map(|t| fuzz::token_set_ratio(&t, text))
                    .max();
                if let Some(score) = best.filter(|s| fuzz::passes(*s, PLAYER_MATCH_THRESHOLD)) {
                    scored.push((name, score));
                }
            }
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        let mut out = Vec::new();
        for (name, _) in scored {
            push_unique(&mut out, name.clone());
        }
        out
    }

    pub fn extract_seasons(&self, text: &str) -> Vec<Season> {
        let mut hits: Vec<(usize, Season)> = self
            .seasons
            .iter()
            .flat_map(|(season, re)| re.find_iter(text).map(move |m| (m.start(), *season)))
            .collect();

        if hits.is_empty() {
            let stripped = self.gameweek.replace_all(text, " ");
            let stripped = self.budget.replace_all(&stripped, " ");
            hits = self
                .bare_year
                .find_iter(&stripped)
                .filter_map(|m| Season::from_year_token(m.as_str()).map(|s| (m.start(), s)))
                .collect();
        }

        hits.sort_by_key(|(pos, _)| *pos);
        let mut out = Vec::new();
        for (_, season) in hits {
            push_unique(&mut out, season);
        }
        out
    }

    /// Short stat names match by whole word, as do a few longer names that
    /// hide inside everyday words.
    pub fn extract_statistics(&self, text: &str) -> Vec<StatKey> {
        let lower = text.to_lowercase();
        let words: HashSet<String> = fuzz::tokens(text).into_iter().collect();
        let mut out = Vec::new();

        for &key in StatKey::ALL {
            let hit = key.variants().iter().any(|variant| {
                if variant.chars().count() <= 3 || WHOLE_WORD_VARIANTS.contains(variant) {
                    words.contains(*variant)
                } else {
                    lower.contains(variant)
                        || fuzz::passes(fuzz::best_window_score(variant, &lower), FUZZY_MATCH_THRESHOLD)
                }
            });
            if hit {
                push_unique(&mut out, key);
            }
        }
        out
    }

    pub fn extract_budget(&self, text: &str) -> Vec<f64> {
        let mut out = Vec::new();
        for caps in self.budget.captures_iter(text) {
            if let Some(v) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                push_unique(&mut out, v);
            }
        }
        if out.is_empty() {
            out.push(DEFAULT_BUDGET);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> EntityResolver {
        EntityResolver::new().unwrap()
    }

    fn vocab() -> Vocabulary {
        Vocabulary::new(
            [
                "Arsenal",
                "Chelsea",
                "Liverpool",
                "Manchester City",
                "Tottenham Hotspur",
                "Wolverhampton Wanderers",
            ],
            [
                "Mohamed Salah",
                "Harry Kane",
                "Erling Haaland",
                "Heung-Min Son",
                "Mohamed Elneny",
            ],
        )
    }

    #[test]
    fn gameweeks_in_order_without_duplicates() {
        let r = resolver();
        assert_eq!(r.extract_gameweeks("GW5 then gameweek 12 and gw5"), vec![5, 12]);
        assert_eq!(r.extract_gameweeks("matchday 3, Round 4"), vec![3, 4]);
        assert!(r.extract_gameweeks("no weeks here").is_empty());
    }

    #[test]
    fn positions_by_substring_and_fuzzy() {
        let r = resolver();
        assert_eq!(r.extract_positions("best defenders and strikers"), vec![Position::Defender, Position::Forward]);
        assert_eq!(r.extract_positions("cheap goalkeepers"), vec![Position::Goalkeeper]);
        // misspelt, caught by the windowed score
        assert_eq!(r.extract_positions("top midfeelders"), vec![Position::Midfielder]);
    }

    #[test]
    fn teams_from_aliases_spans_and_containment() {
        let r = resolver();
        let v = vocab();
        assert_eq!(r.extract_teams("How did MCI do?", &v.teams), vec!["Manchester City".to_string()]);
        assert_eq!(
            r.extract_teams("Liverpool vs Chelsea", &v.teams),
            vec!["Liverpool".to_string(), "Chelsea".to_string()]
        );
        assert_eq!(
            r.extract_teams("Did Arsenall beat anyone?", &v.teams),
            vec!["Arsenal".to_string()]
        );
        assert_eq!(
            r.extract_teams("spurs defense", &v.teams),
            vec!["Tottenham Hotspur".to_string()]
        );
    }

    #[test]
    fn alias_needs_word_boundary() {
        let r = resolver();
        // "che" inside "cheap" is not Chelsea
        assert!(r.extract_teams("cheap options", &[]).is_empty());
    }

    #[test]
    fn players_full_name_then_tokens() {
        let r = resolver();
        let v = vocab();
        assert_eq!(
            r.extract_players("Show me Mohamed Salah stats", &v.players),
            vec!["Mohamed Salah".to_string()]
        );
        assert_eq!(
            r.extract_players("Compare Haaland and Kane goals", &v.players),
            vec!["Harry Kane".to_string(), "Erling Haaland".to_string()]
        );
        assert_eq!(
            r.extract_players("Show Kane and Son assists", &v.players),
            vec!["Harry Kane".to_string(), "Heung-Min Son".to_string()]
        );
    }

    #[test]
    fn seasons_regex_and_fallback() {
        let r = resolver();
        assert_eq!(r.extract_seasons("2021-22 data"), vec![Season::S2021_22]);
        assert_eq!(r.extract_seasons("22/23 and 21 22"), vec![Season::S2022_23, Season::S2021_22]);
        assert_eq!(r.extract_seasons("season 22 stats"), vec![Season::S2022_23]);
        assert_eq!(r.extract_seasons("in 21"), vec![Season::S2021_22]);
        // gameweek numbers are not years
        assert!(r.extract_seasons("gw 22 points").is_empty());
    }

    #[test]
    fn statistics_short_variants_need_whole_words() {
        let r = resolver();
        assert_eq!(r.extract_statistics("cs and yc"), vec![StatKey::CleanSheets, StatKey::YellowCards]);
        assert!(!r.extract_statistics("success").contains(&StatKey::CleanSheets));
        assert_eq!(r.extract_statistics("ict index"), vec![StatKey::IctIndex]);
    }

    #[test]
    fn form_is_not_found_inside_other_words() {
        let r = resolver();
        assert!(!r.extract_statistics("best performance information").contains(&StatKey::Form));
        assert!(!r.extract_statistics("what formation does Arsenal use").contains(&StatKey::Form));
        assert!(r.extract_statistics("who is in form").contains(&StatKey::Form));
        assert!(r.extract_statistics("current form leaders").contains(&StatKey::Form));
    }

    #[test]
    fn budget_defaults_when_absent() {
        let r = resolver();
        assert_eq!(r.extract_budget("players under 6.5"), vec![6.5]);
        assert_eq!(r.extract_budget("cheap players"), vec![DEFAULT_BUDGET]);
    }

    #[test]
    fn resolves_goals_against_wolves() {
        let bag = resolver().resolve("How many goals did Salah score against Wolves", &vocab());
        assert_eq!(bag.players, vec!["Mohamed Salah".to_string()]);
        assert_eq!(bag.teams, vec!["Wolverhampton Wanderers".to_string()]);
        assert_eq!(bag.statistics, vec![StatKey::Goals]);
        assert!(bag.gameweeks.is_empty());
        assert!(bag.positions.is_empty());
        assert!(bag.seasons.is_empty());
    }

    #[test]
    fn empty_vocabulary_is_not_an_error() {
        let bag = resolver().resolve("How did Salah do in GW5?", &Vocabulary::default());
        assert!(bag.players.is_empty());
        assert_eq!(bag.gameweeks, vec![5]);
    }
}
