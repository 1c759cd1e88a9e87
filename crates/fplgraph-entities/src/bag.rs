//! The categorized extraction result for one utterance.

use serde::{Deserialize, Serialize};

use crate::kinds::{Position, Season, StatKey};

/// Budget (in millions) assumed when the utterance names none.
pub const DEFAULT_BUDGET: f64 = 6.0;

/// Entities found in one utterance.
///
/// Every category is an insertion-ordered list without duplicates; an empty
/// list means nothing of that kind was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityBag {
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub gameweeks: Vec<u32>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub statistics: Vec<StatKey>,
    #[serde(default)]
    pub budget: Vec<f64>,
}

impl EntityBag {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
            && self.teams.is_empty()
            && self.gameweeks.is_empty()
            && self.positions.is_empty()
            && self.seasons.is_empty()
            && self.statistics.is_empty()
            && self.budget.is_empty()
    }

    /// Budget to use for value questions.
    pub fn effective_budget(&self) -> f64 {
        self.budget.first().copied().unwrap_or(DEFAULT_BUDGET)
    }

    /// True when the budget came from the question rather than the default
    /// the resolver fills in.
    pub fn has_stated_budget(&self) -> bool {
        self.budget.iter().any(|b| *b != DEFAULT_BUDGET)
    }
}

/// Append `value` unless an equal value is already present.
pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) -> bool {
    if list.contains(&value) {
        false
    } else {
        list.push(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_unique_keeps_first_seen_order() {
        let mut v = Vec::new();
        assert!(push_unique(&mut v, "b"));
        assert!(push_unique(&mut v, "a"));
        assert!(!push_unique(&mut v, "b"));
        assert_eq!(v, vec!["b", "a"]);
    }

    #[test]
    fn missing_categories_deserialize_as_empty() {
        let bag: EntityBag = serde_json::from_str(r#"{"players":["Harry Kane"]}"#).unwrap();
        assert_eq!(bag.players, vec!["Harry Kane".to_string()]);
        assert!(bag.teams.is_empty());
        assert_eq!(bag.effective_budget(), DEFAULT_BUDGET);
    }

    #[test]
    fn default_budget_is_not_a_stated_one() {
        let mut bag = EntityBag {
            budget: vec![DEFAULT_BUDGET],
            ..Default::default()
        };
        assert!(!bag.has_stated_budget());
        bag.budget.push(7.5);
        assert!(bag.has_stated_budget());
    }
}
