//! Closed vocabularies: positions, seasons and statistic keys.
//!
//! These are the categories whose canonical values are fixed by the graph
//! schema rather than read from the store. Each carries the surface variants
//! the resolver looks for in an utterance.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Position
// ============================================================================

/// Playing position, stored on `(:Position {name})` nodes as the short code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Position {
    /// Scan order used by the resolver.
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn variants(self) -> &'static [&'static str] {
        match self {
            Position::Goalkeeper => &["goalkeeper", "goalkeepers", "keeper", "keepers", "goalie", "goalies"],
            Position::Defender => &["defender", "defenders", "defence", "defense", "backline"],
            Position::Midfielder => &["midfielder", "midfielders", "midfield"],
            Position::Forward => &["forward", "forwards", "attacker", "attackers", "striker", "strikers"],
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Season
// ============================================================================

/// A season present in the graph (`(:Season {season_name})`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "2021-22")]
    S2021_22,
    #[serde(rename = "2022-23")]
    S2022_23,
}

impl Season {
    pub const ALL: [Season; 2] = [Season::S2021_22, Season::S2022_23];

    /// Season assumed when a template needs one and the utterance names none.
    pub const DEFAULT: Season = Season::S2022_23;

    pub fn label(self) -> &'static str {
        match self {
            Season::S2021_22 => "2021-22",
            Season::S2022_23 => "2022-23",
        }
    }

    /// Start year, last two digits.
    pub(crate) fn start_yy(self) -> u32 {
        match self {
            Season::S2021_22 => 21,
            Season::S2022_23 => 22,
        }
    }

    /// Map a bare year token (`2021`, `22`, ...) to the season it most
    /// likely refers to.
    pub fn from_year_token(token: &str) -> Option<Self> {
        match token {
            "2021" | "21" => Some(Season::S2021_22),
            "2022" | "22" | "2023" | "23" => Some(Season::S2022_23),
            _ => None,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label.trim())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Statistic keys
// ============================================================================

macro_rules! stat_keys {
    ($( $variant:ident => $key:literal, $prop:literal, [$($surface:literal),* $(,)?] );* $(;)?) => {
        /// Canonical statistic keys, in resolver scan order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum StatKey {
            $( $variant, )*
        }

        impl StatKey {
            pub const ALL: &'static [StatKey] = &[ $( StatKey::$variant, )* ];

            /// Canonical key as it appears in an `EntityBag`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( StatKey::$variant => $key, )*
                }
            }

            /// Relationship property that stores this statistic on
            /// `[:PLAYED_IN]`.
            pub fn property(self) -> &'static str {
                match self {
                    $( StatKey::$variant => $prop, )*
                }
            }

            /// Surface forms recognised in an utterance.
            pub fn variants(self) -> &'static [&'static str] {
                match self {
                    $( StatKey::$variant => &[$($surface),*], )*
                }
            }
        }
    };
}

stat_keys! {
    Assists => "assists", "assists", ["assist", "assists"];
    Goals => "goals", "goals_scored", ["goal", "goals", "scored"];
    Bonus => "bonus", "bonus", ["bonus", "bps"];
    CleanSheets => "clean_sheets", "clean_sheets", ["clean sheet", "clean sheets", "cs"];
    Creativity => "creativity", "creativity", ["creativity"];
    Bps => "bps", "bps", ["bps", "bonus point system"];
    GoalsConceded => "goals_conceded", "goals_conceded", ["conceded", "goals conceded", "goals_allowed"];
    GoalsScored => "goals_scored", "goals_scored", ["goals scored", "scored goals"];
    IctIndex => "ict_index", "ict_index", ["ict", "ict index"];
    Influence => "influence", "influence", ["influence"];
    Minutes => "minutes", "minutes", ["minutes", "mins", "played minutes"];
    OwnGoals => "own_goals", "own_goals", ["own goal", "own goals"];
    PenaltiesMissed => "penalties_missed", "penalties_missed", ["penalty missed", "penalties missed", "pen_missed"];
    PenaltiesSaved => "penalties_saved", "penalties_saved", ["penalty saved", "penalties saved", "pen_saved"];
    RedCards => "red_cards", "red_cards", ["red card", "red cards"];
    Saves => "saves", "saves", ["save", "saves"];
    Selected => "selected", "selected", ["selected", "ownership"];
    Threat => "threat", "threat", ["threat"];
    TotalPoints => "total_points", "total_points", ["total points", "points", "total"];
    TransfersBalance => "transfers_balance", "transfers_balance", ["transfers balance", "transfer balance"];
    TransfersIn => "transfers_in", "transfers_in", ["transfers in", "transfer in", "transfers_in"];
    TransfersOut => "transfers_out", "transfers_out", ["transfers out", "transfer out", "transfers_out"];
    Value => "value", "value", ["value", "price", "market value"];
    YellowCards => "yellow_cards", "yellow_cards", ["yellow card", "yellow cards", "yc"];
    Form => "form", "form", ["form", "current form"];
}

impl StatKey {
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
