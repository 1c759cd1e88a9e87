//! Template catalog: intent id → Cypher body + required parameters.
//!
//! Bodies use two kinds of `$name` placeholder:
//!
//! - **bound** (`$player1`, `$team1`, `$position`, `$gw`, `$season`): passed to
//!   the store as query parameters;
//! - **structural** (`$stat_property`, `$limit`, `$budget`): Cypher cannot bind
//!   a property name or a `LIMIT` expression, so these are substituted into
//!   the text by the binder from validated literals.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Player1,
    Player2,
    Team1,
    Team2,
    Position,
    Gw,
    Season,
    StatProperty,
    Limit,
    Budget,
}

impl Param {
    pub const ALL: [Param; 10] = [
        Param::Player1,
        Param::Player2,
        Param::Team1,
        Param::Team2,
        Param::Position,
        Param::Gw,
        Param::Season,
        Param::StatProperty,
        Param::Limit,
        Param::Budget,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::Player1 => "player1",
            Param::Player2 => "player2",
            Param::Team1 => "team1",
            Param::Team2 => "team2",
            Param::Position => "position",
            Param::Gw => "gw",
            Param::Season => "season",
            Param::StatProperty => "stat_property",
            Param::Limit => "limit",
            Param::Budget => "budget",
        }
    }

    /// Substituted into the query text rather than bound by the store.
    pub fn is_structural(self) -> bool {
        matches!(self, Param::StatProperty | Param::Limit | Param::Budget)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub description: &'static str,
    pub body: &'static str,
    pub required: &'static [Param],
}

impl Template {
    pub fn requires(&self, param: Param) -> bool {
        self.required.contains(&param)
    }
}

use Param::*;

macro_rules! templates {
    ($( $id:literal, $desc:literal, [$($p:ident),* $(,)?], $body:expr; )*) => {
        const TEMPLATES: &[Template] = &[
            $( Template { id: $id, description: $desc, body: $body, required: &[$($p),*] }, )*
        ];
    };
}

templates! {
    // ---------------------------------------------------------------------
    // Player performance & comparison
    // ---------------------------------------------------------------------
    "PLAYER_STATS_GW_SEASON",
    "Stats for a player in a specific gameweek of a season",
    [Player1, Gw, Season],
    r#"
MATCH (p:Player {player_name: $player1})
   -[r:PLAYED_IN]->
   (f:Fixture)<-[:HAS_FIXTURE]-(gw:Gameweek {GW_number: $gw})
WHERE gw.season = $season
RETURN p.player_name AS player,
   gw.season AS season,
   gw.GW_number AS gw,
   r.total_points AS total_points,
   r.goals_scored AS goals_scored,
   r.assists AS assists,
   r.clean_sheets AS clean_sheets,
   r.minutes AS minutes,
   r.bonus AS bonus,
   r.yellow_cards AS yellow_cards,
   r.red_cards AS red_cards,
   r.saves AS saves,
   r.goals_conceded AS goals_conceded
"#;

    "COMPARE_PLAYERS_BY_TOTAL_POINTS",
    "Two players compared by total points",
    [Player1, Player2],
    r#"
MATCH (p1:Player {player_name: $player1})
OPTIONAL MATCH (p1)-[r1:PLAYED_IN]->(:Fixture)
WITH $player1 AS player1_name, coalesce(sum(r1.total_points), 0) AS p1_pts
MATCH (p2:Player {player_name: $player2})
OPTIONAL MATCH (p2)-[r2:PLAYED_IN]->(:Fixture)
WITH player1_name, p1_pts, $player2 AS player2_name, coalesce(sum(r2.total_points), 0) AS p2_pts
RETURN
   player1_name AS player1,
   p1_pts AS player1_points,
   player2_name AS player2,
   p2_pts AS player2_points
"#;

    "COMPARE_PLAYERS_BY_SPECIFIC_STAT_TOTAL_ALL_TIME",
    "Two players compared by the all-time sum of a stat",
    [Player1, Player2, StatProperty],
    r#"
MATCH (p1:Player {player_name: $player1})
OPTIONAL MATCH (p1)-[r1:PLAYED_IN]->(:Fixture)
WITH $player1 AS player1_name, coalesce(sum(r1.$stat_property), 0) AS p1_sum_$stat_property
MATCH (p2:Player {player_name: $player2})
OPTIONAL MATCH (p2)-[r2:PLAYED_IN]->(:Fixture)
WITH player1_name, p1_sum_$stat_property, $player2 AS player2_name, coalesce(sum(r2.$stat_property), 0) AS p2_sum_$stat_property
RETURN
   player1_name AS player1,
   p1_sum_$stat_property AS player1_sum_$stat_property,
   player2_name AS player2,
   p2_sum_$stat_property AS player2_sum_$stat_property
"#;

    "COMPARE_PLAYERS_BY_SPECIFIC_STAT_AVG",
    "Two players compared by the average of a stat",
    [Player1, Player2, StatProperty],
    r#"
MATCH (p1:Player {player_name: $player1})
OPTIONAL MATCH (p1)-[r1:PLAYED_IN]->(:Fixture)
WITH $player1 AS player1_name, coalesce(avg(r1.$stat_property), 0) AS p1_avg_$stat_property
MATCH (p2:Player {player_name: $player2})
OPTIONAL MATCH (p2)-[r2:PLAYED_IN]->(:Fixture)
WITH player1_name, p1_avg_$stat_property, $player2 AS player2_name, coalesce(avg(r2.$stat_property), 0) AS p2_avg_$stat_property
RETURN
   player1_name AS player1,
   p1_avg_$stat_property AS player1_avg_$stat_property,
   player2_name AS player2,
   p2_avg_$stat_property AS player2_avg_$stat_property
"#;

    "PLAYER_CAREER_STATS_TOTALS",
    "Career totals for a player",
    [Player1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
RETURN p.player_name AS player,
   sum(r.total_points) AS total_points,
   sum(r.goals_scored) AS career_goals,
   sum(r.assists) AS career_assists,
   sum(r.clean_sheets) AS career_clean_sheets,
   count(r) AS matches_played
"#;

    "PLAYER_SPECIFIC_STAT_SUM",
    "Sum of one stat for a player",
    [Player1, StatProperty],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
RETURN p.player_name AS player,
   sum(r.$stat_property) AS sum_$stat_property,
   count(r) AS matches_played
"#;

    "PLAYER_SPECIFIC_STAT_AVG",
    "Average of one stat for a player",
    [Player1, StatProperty],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
RETURN p.player_name AS player,
   avg(r.$stat_property) AS avg_$stat_property,
   count(r) AS matches_played
"#;

    "PLAYER_SPECIFIC_STAT_SUM_SPECIFIC_SEASON",
    "Sum of one stat for a player in a season",
    [Player1, StatProperty, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season
RETURN p.player_name AS player,
   sum(r.$stat_property) AS sum_$stat_property,
   count(r) AS matches_played
"#;

    "PLAYER_SPECIFIC_STAT_AVG_SPECIFIC_SEASON",
    "Average of one stat for a player in a season",
    [Player1, StatProperty, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season
RETURN p.player_name AS player,
   avg(r.$stat_property) AS avg_$stat_property,
   count(r) AS matches_played
"#;

    "PLAYER_SPECIFIC_STAT_VS_SPECIFIC_TEAM",
    "Sum of one stat for a player in fixtures against a team",
    [Player1, Team1, StatProperty],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (t:Team {name: $team1})
WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (f)-[:HAS_AWAY_TEAM]->(t)
RETURN p.player_name AS player,
   t.name AS opponent,
   sum(r.$stat_property) AS sum_$stat_property,
   count(f) AS matches_played
"#;

    "TOP_PLAYERS_BY_STAT",
    "Leaderboard by the sum of a stat",
    [StatProperty, Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.$stat_property) AS total_stat
RETURN p.player_name AS player, total_stat
ORDER BY total_stat DESC
LIMIT $limit
"#;

    // ---------------------------------------------------------------------
    // Top performers & leaderboards
    // ---------------------------------------------------------------------
    "TOP_PLAYERS_BY_POSITION_IN_POINTS",
    "Leaderboard by total points within a position",
    [Position, Limit],
    r#"
MATCH (p:Player)-[:PLAYS_AS]->(pos:Position {name: $position})
MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.total_points) AS total_pts
RETURN p.player_name AS player, total_pts
ORDER BY total_pts DESC
LIMIT $limit
"#;

    "TOP_PLAYERS_BY_POSITION_IN_FORM",
    "Leaderboard by average form within a position",
    [Position, Limit],
    r#"
MATCH (p:Player)-[:PLAYS_AS]->(pos:Position {name: $position})
MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WITH p, avg(r.form) AS avg_form
RETURN p.player_name AS player, avg_form
ORDER BY avg_form DESC
LIMIT $limit
"#;

    "TOP_SUM_OF_SPECIFIC_STAT_LEADERS_ANY_POSITION",
    "Leaders by the total of a stat, any position",
    [StatProperty, Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.$stat_property) AS stat_total
RETURN p.player_name AS player, stat_total
ORDER BY stat_total DESC
LIMIT $limit
"#;

    "TOP_SUM_OF_SPECIFIC_STAT_LEADERS_SPECIFIC_POSITION",
    "Leaders by the total of a stat within a position",
    [Position, StatProperty, Limit],
    r#"
MATCH (p:Player)-[:PLAYS_AS]->(pos:Position {name: $position})
MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.$stat_property) AS stat_total
RETURN p.player_name AS player, stat_total
ORDER BY stat_total DESC
LIMIT $limit
"#;

    "TOP_AVG_OF_SPECIFIC_STAT_LEADERS",
    "Leaders by the average of a stat",
    [StatProperty, Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, avg(r.$stat_property) AS stat_avg
RETURN p.player_name AS player, stat_avg
ORDER BY stat_avg DESC
LIMIT $limit
"#;

    "TOP_AVG_OF_SPECIFIC_STAT_LEADERS_SPECIFIC_POSITION",
    "Leaders by the average of a stat within a position",
    [Position, StatProperty, Limit],
    r#"
MATCH (p:Player)-[:PLAYS_AS]->(pos:Position {name: $position})
MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WITH p, avg(r.$stat_property) AS stat_avg
RETURN p.player_name AS player, stat_avg
ORDER BY stat_avg DESC
LIMIT $limit
"#;

    // ---------------------------------------------------------------------
    // Compound & derived stats
    // ---------------------------------------------------------------------
    "MOST_CARDS_LEADERS",
    "Leaders by disciplinary score",
    [Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.yellow_cards) AS yellow_cards, sum(r.red_cards) AS red_cards
RETURN p.player_name AS player, yellow_cards, red_cards, (yellow_cards * 1 + red_cards * 3) AS disciplinary_score
ORDER BY disciplinary_score DESC
LIMIT $limit
"#;

    "MOST_GOAL_CONTRIBUTIONS",
    "Leaders by goals plus assists",
    [Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.goals_scored) AS goals, sum(r.assists) AS assists
RETURN p.player_name AS player, goals, assists, (goals + assists) AS goal_contributions
ORDER BY goal_contributions DESC
LIMIT $limit
"#;

    "POINTS_PER_MINUTE_LEADERS",
    "Leaders by points per minute played",
    [Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, sum(r.minutes) AS total_minutes, sum(r.total_points) AS total_points
WHERE total_points > 0 AND total_minutes > 0
RETURN p.player_name AS player,
   total_points / total_minutes AS points_per_minute,
   total_points as total_points,
   total_minutes as total_minutes
ORDER BY points_per_minute DESC
LIMIT $limit
"#;

    "PLAYER_POINTS_PER_MINUTE",
    "Points per minute for a player",
    [Player1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
WITH sum(r.minutes) AS total_minutes, sum(r.total_points) AS total_points
WHERE total_points > 0 AND total_minutes > 0
RETURN total_points / total_minutes AS points_per_minute,
   total_points AS total_points,
   total_minutes AS total_minutes
"#;

    "PLAYER_POINTS_PER_MINUTE_SPECIFIC_SEASON",
    "Points per minute for a player in a season",
    [Player1, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season
WITH sum(r.minutes) AS total_minutes, sum(r.total_points) AS total_points
WHERE total_points > 0 AND total_minutes > 0
RETURN total_points / total_minutes AS points_per_minute,
   total_points AS total_points,
   total_minutes AS total_minutes
"#;

    "PLAYER_TOTAL_CARDS",
    "Cards and disciplinary score for a player",
    [Player1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
WITH sum(r.yellow_cards) AS yellow_cards, sum(r.red_cards) AS red_cards
RETURN yellow_cards, red_cards, (yellow_cards * 1 + red_cards * 3) AS disciplinary_score
"#;

    "PLAYER_GOAL_CONTRIBUTIONS",
    "Goals plus assists for a player",
    [Player1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
WITH sum(r.goals_scored) AS goals, sum(r.assists) AS assists
RETURN goals, assists, (goals + assists) AS goal_contributions
"#;

    "PLAYER_GOAL_CONTRIBUTIONS_SPECIFIC_SEASON",
    "Goals plus assists for a player in a season",
    [Player1, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season
WITH sum(r.goals_scored) AS goals, sum(r.assists) AS assists
RETURN goals, assists, (goals + assists) AS goal_contributions
"#;

    "PLAYER_TOTAL_CARDS_SPECIFIC_SEASON",
    "Cards and disciplinary score for a player in a season",
    [Player1, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season
WITH sum(r.yellow_cards) AS yellow_cards, sum(r.red_cards) AS red_cards
RETURN yellow_cards, red_cards, (yellow_cards * 1 + red_cards * 3) AS disciplinary_score
"#;

    // ---------------------------------------------------------------------
    // Team analysis
    // ---------------------------------------------------------------------
    "PLAYER_POINTS_VS_SPECIFIC_TEAM",
    "Points a player scored against a team",
    [Player1, Team1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (t:Team {name: $team1})
WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (f)-[:HAS_AWAY_TEAM]->(t)
RETURN p.player_name AS player,
   t.name AS opponent,
   sum(r.total_points) AS total_points_vs_opponent,
   count(f) AS matches_played
"#;

    // ---------------------------------------------------------------------
    // Value & recent performance
    // ---------------------------------------------------------------------
    "PLAYER_LAST_N_FIXTURES_PERFORMANCE",
    "Most recent fixtures and points for a player",
    [Player1, Limit],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
OPTIONAL MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
RETURN f.kickoff_time AS date, gw.GW_number AS gw, r.total_points
ORDER BY date DESC
LIMIT $limit
"#;

    "BEST_VALUE_PLAYERS_UNDER_BUDGET",
    "Highest scorers whose price stayed within a budget",
    [Budget, Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WHERE r.value <= $budget * 10
WITH p, max(r.value) AS top_value, sum(r.total_points) AS total_points
RETURN p.player_name AS player, top_value / 10.0 AS price, total_points
ORDER BY total_points DESC
LIMIT $limit
"#;

    // ---------------------------------------------------------------------
    // Appearances, splits & consistency
    // ---------------------------------------------------------------------
    "PLAYER_MAX_SPECIFIC_STAT_SINGLE_MATCH",
    "Single-match maximum of a stat for a player",
    [Player1, StatProperty],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(:Fixture)
RETURN max(r.$stat_property) AS max_$stat_property
"#;

    "PLAYER_FIXTURE_COUNT_SPECIFIC_SEASON",
    "Appearances for a player in a season",
    [Player1, Season],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE gw.season = $season AND r.minutes > 0
RETURN count(r) AS appearances_in_season
"#;

    "PLAYER_FIXTURE_COUNT_TOTAL",
    "Appearances for a player across all seasons",
    [Player1],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (gw:Gameweek)-[:HAS_FIXTURE]->(f)
WHERE r.minutes > 0
RETURN count(r) AS appearances_in_season
"#;

    "PLAYER_BEST_PERFORMANCE_AGAINST_WHICH_OPPONENTS",
    "Opponents a player scored the most points against",
    [Player1, Limit],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (t:Team)
WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (f)-[:HAS_AWAY_TEAM]->(t)
WITH t, sum(r.total_points) AS points
ORDER BY points DESC
SKIP 1        // the top row is the player's own team
LIMIT $limit
RETURN t.name AS opponent, points
"#;

    "PLAYER_WORST_PERFORMANCE_AGAINST_WHICH_OPPONENTS",
    "Opponents a player scored the fewest points against",
    [Player1, Limit],
    r#"
MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)
MATCH (t:Team)
WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (f)-[:HAS_AWAY_TEAM]->(t)
RETURN t.name AS opponent, sum(r.total_points) AS points
ORDER BY points ASC
LIMIT $limit
"#;

    "POSITION_BEST_AVG_POINTS",
    "Average points per appearance by position",
    [],
    r#"
MATCH (pos:Position)<-[:PLAYS_AS]-(p:Player)
MATCH (p)-[r:PLAYED_IN]->(:Fixture)
WHERE r.minutes>0
WITH pos, avg(r.total_points) AS avg_points
RETURN pos.name AS position, avg_points
ORDER BY avg_points DESC
"#;

    "POSITION_PLAYERS_COUNT",
    "Number of players per position",
    [],
    r#"
MATCH (pos:Position)<-[:PLAYS_AS]-(p:Player)
RETURN pos.name AS position, count(p) AS players
"#;

    "LEAST_CONSISTENT_PLAYERS",
    "Players with the highest standard deviation of points",
    [Limit],
    r#"
MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
WITH p, stdev(r.total_points) AS inconsistency
RETURN p.player_name AS player, inconsistency
ORDER BY inconsistency DESC
LIMIT $limit
"#;
}

// ============================================================================
// Catalog
// ============================================================================

/// The closed, process-wide set of templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn get(id: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|t| t.id == id)
    }

    pub fn all() -> &'static [Template] {
        TEMPLATES
    }

    pub fn ids() -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|t| t.id)
    }

    pub fn contains(id: &str) -> bool {
        Self::get(id).is_some()
    }
}

/// Every `$name` placeholder in `body`, in first-seen order.
pub fn placeholders(body: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                let name = &body[start..end];
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    out
}
