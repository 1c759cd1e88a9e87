//! Static analysis of Cypher pattern clauses.
//!
//! Given a (bound) template query, derive an *extraction query*: the same
//! query, comments stripped, with every `WITH` and the final `RETURN`
//! extended so the matched nodes and relationships survive to the result.
//! The store then reports them in its graph section.
//!
//! ```text
//! MATCH (p:Player)-[r:PLAYED_IN]->(:Fixture)
//! WITH p, sum(r.minutes) AS mins            WITH p, sum(r.minutes) AS mins, collect(DISTINCT r) AS r
//! RETURN p.player_name AS player, mins  ─►  RETURN p.player_name AS player, mins, p, r
//! ```
//!
//! Scope rules across `WITH`:
//! - a variable projected bare (`WITH p`) or renamed (`WITH p AS q`) stays;
//! - a dropped variable is carried as `collect(DISTINCT v) AS v` when the
//!   `WITH` aggregates (or is `DISTINCT`), bare otherwise; a variable that is
//!   already a list is collected again, and the store walks the nested lists;
//! - a variable that a later pattern clause binds again is not carried;
//! - a carried name that collides with a projected column gets a `_graph`
//!   suffix.
//!
//! Anything the analyzer does not understand (lexing failure, `UNION`, no
//! named pattern variables, no final `RETURN`) yields `None`.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{anychar, char as pchar, digit1, multispace1, one_of};
use nom::combinator::{map, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, tuple};
use nom::IResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain or backtick-quoted identifier (keywords included).
    Ident,
    Str,
    Param,
    Number,
    Punct,
}

/// What separated a token from its predecessor in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset into the source.
    pub offset: usize,
    gap: Gap,
}

impl Token<'_> {
    fn is(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    fn is_kw(&self, kw: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(kw)
    }

    fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot tokenize Cypher at byte {offset}")]
pub struct LexError {
    pub offset: usize,
}

// ============================================================================
// Lexer
// ============================================================================

/// Tokenize `query`, dropping whitespace and comments.
pub fn lex(query: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut rest = query;
    loop {
        let at = query.len() - rest.len();
        let (after, skipped) = trivia(rest).map_err(|_| LexError { offset: at })?;
        rest = after;
        if rest.is_empty() {
            break;
        }
        let at = query.len() - rest.len();
        if rest.starts_with("/*") {
            // unterminated block comment
            return Err(LexError { offset: at });
        }
        let (after, (kind, text)) = token(rest).map_err(|_| LexError { offset: at })?;
        let gap = if skipped.contains('\n') {
            Gap::Newline
        } else if skipped.is_empty() {
            Gap::None
        } else {
            Gap::Space
        };
        tokens.push(Token {
            kind,
            text,
            offset: at,
            gap,
        });
        rest = after;
    }
    Ok(tokens)
}

fn trivia(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((multispace1, line_comment, block_comment))))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_while(|c| c != '\n')))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    alt((
        map(string_literal, |s| (TokenKind::Str, s)),
        map(backticked, |s| (TokenKind::Ident, s)),
        map(parameter, |s| (TokenKind::Param, s)),
        map(number, |s| (TokenKind::Number, s)),
        map(identifier, |s| (TokenKind::Ident, s)),
        map(punct, |s| (TokenKind::Punct, s)),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((quoted('\''), quoted('"')))(input)
}

fn quoted<'a>(q: char) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        recognize(tuple((
            pchar(q),
            many0(alt((
                recognize(pair(pchar('\\'), anychar)),
                take_while1(move |c| c != q && c != '\\'),
            ))),
            pchar(q),
        )))(input)
    }
}

fn backticked(input: &str) -> IResult<&str, &str> {
    recognize(tuple((pchar('`'), take_while(|c| c != '`'), pchar('`'))))(input)
}

fn parameter(input: &str) -> IResult<&str, &str> {
    recognize(pair(pchar('$'), take_while1(is_ident_continue)))(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(pchar('.'), digit1))))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue)))(input)
}

fn punct(input: &str) -> IResult<&str, &str> {
    alt((
        tag("->"),
        tag("<-"),
        tag("<>"),
        tag("<="),
        tag(">="),
        tag("=~"),
        tag(".."),
        tag("+="),
        recognize(one_of("()[]{}:,.;|*+-/%<>=^!")),
    ))(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// Clauses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Match,
    OptionalMatch,
    Where,
    With,
    Return,
    OrderBy,
    Skip,
    Limit,
    Unwind,
    Call,
    Union,
    Update,
}

impl ClauseKind {
    fn is_pattern(self) -> bool {
        matches!(self, ClauseKind::Match | ClauseKind::OptionalMatch)
    }
}

/// Token ranges: `start` is the keyword, `body..end` what follows it.
#[derive(Debug, Clone, Copy)]
struct Clause {
    kind: ClauseKind,
    body: usize,
    end: usize,
}

fn clause_keyword(tokens: &[Token<'_>], i: usize) -> Option<(ClauseKind, usize)> {
    let t = &tokens[i];
    if !t.is_ident() || t.text.starts_with('`') {
        return None;
    }
    if let Some(prev) = i.checked_sub(1).map(|p| &tokens[p]) {
        // property access, and `STARTS WITH` / `ENDS WITH`
        if prev.is(".") || prev.is_kw("STARTS") || prev.is_kw("ENDS") {
            return None;
        }
    }
    let next_is = |kw: &str| tokens.get(i + 1).is_some_and(|n| n.is_kw(kw));
    let kind = match t.text.to_ascii_uppercase().as_str() {
        "MATCH" => (ClauseKind::Match, 1),
        "OPTIONAL" if next_is("MATCH") => (ClauseKind::OptionalMatch, 2),
        "WHERE" => (ClauseKind::Where, 1),
        "WITH" => (ClauseKind::With, 1),
        "RETURN" => (ClauseKind::Return, 1),
        "ORDER" if next_is("BY") => (ClauseKind::OrderBy, 2),
        "SKIP" => (ClauseKind::Skip, 1),
        "LIMIT" => (ClauseKind::Limit, 1),
        "UNWIND" => (ClauseKind::Unwind, 1),
        "CALL" => (ClauseKind::Call, 1),
        "UNION" => (ClauseKind::Union, 1),
        "CREATE" | "MERGE" | "DELETE" | "DETACH" | "SET" | "REMOVE" | "FOREACH" => {
            (ClauseKind::Update, 1)
        }
        _ => return None,
    };
    Some(kind)
}

/// Split at depth-0 clause keywords. `None` when brackets are unbalanced or
/// the query does not start with a clause.
fn segment(tokens: &[Token<'_>]) -> Option<Vec<Clause>> {
    let mut clauses: Vec<Clause> = Vec::new();
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        if depth == 0 {
            if let Some((kind, width)) = clause_keyword(tokens, i) {
                if let Some(last) = clauses.last_mut() {
                    last.end = i;
                }
                clauses.push(Clause {
                    kind,
                    body: i + width,
                    end: tokens.len(),
                });
                i += width;
                continue;
            }
        }
        if clauses.is_empty() {
            return None;
        }
        let t = &tokens[i];
        if t.kind == TokenKind::Punct {
            match t.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
        }
        if depth < 0 {
            return None;
        }
        i += 1;
    }
    (depth == 0 && !clauses.is_empty()).then_some(clauses)
}

// ============================================================================
// Pattern variables
// ============================================================================

/// Named node/relationship variables (and path variables) of one pattern
/// clause body, first-seen order.
fn clause_variables<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
    let mut out: Vec<&'a str> = Vec::new();
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1);
        let after = tokens.get(i + 2);
        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let named = |closers: &[&str]| {
            next.is_some_and(Token::is_ident)
                && after.is_some_and(|a| a.kind == TokenKind::Punct && closers.contains(&a.text))
        };

        let var = if t.is("(") && !prev.is_some_and(Token::is_ident) && named(&[":", ")", "{"]) {
            next
        } else if t.is("[") && named(&[":", "]", "*", "{"]) {
            next
        } else if depth == 0
            && t.is_ident()
            && next.is_some_and(|n| n.is("="))
            && prev.map_or(true, |p| p.is(","))
        {
            Some(t)
        } else {
            None
        };
        if let Some(v) = var {
            if !out.contains(&v.text) {
                out.push(v.text);
            }
        }

        if t.kind == TokenKind::Punct {
            match t.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
        }
    }
    out
}

/// Every named variable bound by a `MATCH` / `OPTIONAL MATCH` clause, in
/// first-seen order. Empty when the query cannot be analysed.
pub fn pattern_variables(query: &str) -> Vec<String> {
    let Ok(tokens) = lex(query) else {
        return Vec::new();
    };
    let Some(clauses) = segment(&tokens) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for c in clauses.iter().filter(|c| c.kind.is_pattern()) {
        for v in clause_variables(&tokens[c.body..c.end]) {
            if !out.iter().any(|o| o == v) {
                out.push(v.to_string());
            }
        }
    }
    out
}

// ============================================================================
// Projections
// ============================================================================

const AGGREGATES: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "collect",
    "stdev",
    "stdevp",
    "percentilecont",
    "percentiledisc",
];

/// The item list of a `WITH` or `RETURN`.
struct Projection<'t, 'a> {
    star: bool,
    distinct: bool,
    items: Vec<&'t [Token<'a>]>,
}

impl<'t, 'a> Projection<'t, 'a> {
    fn parse(body: &'t [Token<'a>]) -> Self {
        let distinct = body.first().is_some_and(|t| t.is_kw("DISTINCT"));
        let body = if distinct { &body[1..] } else { body };

        let mut items = Vec::new();
        let mut depth = 0i32;
        let mut start = 0;
        for (i, t) in body.iter().enumerate() {
            if t.kind == TokenKind::Punct {
                match t.text {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    "," if depth == 0 => {
                        if i > start {
                            items.push(&body[start..i]);
                        }
                        start = i + 1;
                    }
                    _ => {}
                }
            }
        }
        if body.len() > start {
            items.push(&body[start..]);
        }
        let star = items.first().is_some_and(|item| item.len() == 1 && item[0].is("*"));
        Projection {
            star,
            distinct,
            items,
        }
    }

    fn aggregating(&self) -> bool {
        self.distinct
            || self.items.iter().any(|item| {
                item.windows(2).any(|w| {
                    w[0].is_ident()
                        && w[1].is("(")
                        && AGGREGATES.contains(&w[0].text.to_ascii_lowercase().as_str())
                })
            })
    }

    fn is_bare(&self, name: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.len() == 1 && item[0].is_ident() && item[0].text == name)
    }

    /// `name AS alias` → `alias`.
    fn renamed(&self, name: &str) -> Option<&'a str> {
        self.items.iter().find_map(|item| match item {
            [v, kw, alias] if v.is_ident() && v.text == name && kw.is_kw("AS") && alias.is_ident() => {
                Some(alias.text)
            }
            _ => None,
        })
    }

    /// Column names this projection produces.
    fn columns(&self) -> HashSet<&'a str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                [single] if single.is_ident() => Some(single.text),
                [.., kw, alias] if kw.is_kw("AS") && alias.is_ident() => Some(alias.text),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct ScopeVar {
    name: String,
    /// Already aggregated into a list by an earlier `WITH`.
    list: bool,
}

/// Scope after `projection`, plus the items to append so dropped graph
/// variables survive it.
fn carry_through(
    scope: &[ScopeVar],
    projection: &Projection<'_, '_>,
    rebound_later: &HashSet<&str>,
) -> (Vec<ScopeVar>, Vec<String>) {
    if projection.star {
        return (scope.to_vec(), Vec::new());
    }
    let aggregating = projection.aggregating();
    let mut taken: HashSet<String> = projection.columns().into_iter().map(str::to_string).collect();
    let mut next = Vec::new();
    let mut extra = Vec::new();

    for var in scope {
        if projection.is_bare(&var.name) {
            next.push(var.clone());
            continue;
        }
        if let Some(alias) = projection.renamed(&var.name) {
            next.push(ScopeVar {
                name: alias.to_string(),
                list: var.list,
            });
            continue;
        }
        if rebound_later.contains(var.name.as_str()) {
            continue;
        }
        let name = if taken.contains(&var.name) {
            let suffixed = format!("{}_graph", var.name);
            if taken.contains(&suffixed) {
                continue;
            }
            suffixed
        } else {
            var.name.clone()
        };
        // A bare item in an aggregating projection would become a grouping key.
        let (expr, list) = if aggregating {
            (format!("collect(DISTINCT {})", var.name), true)
        } else {
            (var.name.clone(), var.list)
        };
        extra.push(if expr == name {
            expr
        } else {
            format!("{expr} AS {name}")
        });
        taken.insert(name.clone());
        next.push(ScopeVar { name, list });
    }
    (next, extra)
}

// ============================================================================
// Extraction query
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionQuery {
    pub text: String,
    /// Pattern variables of the source query, first-seen order.
    pub variables: Vec<String>,
}

/// Derive a topology-returning variant of `query`, or `None` when there is
/// nothing to extract or the query is outside what the analyzer handles.
pub fn extraction_query(query: &str) -> Option<ExtractionQuery> {
    let tokens = lex(query).ok()?;
    let clauses = segment(&tokens)?;
    if clauses.iter().any(|c| c.kind == ClauseKind::Union) {
        return None;
    }
    let final_return = clauses.iter().rposition(|c| c.kind == ClauseKind::Return)?;
    if clauses[final_return + 1..]
        .iter()
        .any(|c| !matches!(c.kind, ClauseKind::OrderBy | ClauseKind::Skip | ClauseKind::Limit))
    {
        return None;
    }

    let bound: Vec<Vec<&str>> = clauses
        .iter()
        .map(|c| {
            if c.kind.is_pattern() {
                clause_variables(&tokens[c.body..c.end])
            } else {
                Vec::new()
            }
        })
        .collect();
    let mut variables: Vec<String> = Vec::new();
    for v in bound.iter().flatten() {
        if !variables.iter().any(|o| o == v) {
            variables.push(v.to_string());
        }
    }
    if variables.is_empty() {
        return None;
    }

    let mut scope: Vec<ScopeVar> = Vec::new();
    let mut insertions: BTreeMap<usize, String> = BTreeMap::new();
    for (idx, clause) in clauses.iter().enumerate() {
        match clause.kind {
            ClauseKind::Match | ClauseKind::OptionalMatch => {
                for v in &bound[idx] {
                    if !scope.iter().any(|s| s.name == *v) {
                        scope.push(ScopeVar {
                            name: v.to_string(),
                            list: false,
                        });
                    }
                }
            }
            ClauseKind::With | ClauseKind::Return => {
                if clause.body >= clause.end {
                    return None;
                }
                let is_final = idx == final_return;
                if is_final && scope.is_empty() {
                    return None;
                }
                let rebound_later: HashSet<&str> = if is_final {
                    HashSet::new()
                } else {
                    bound[idx + 1..].iter().flatten().copied().collect()
                };
                let projection = Projection::parse(&tokens[clause.body..clause.end]);
                let (next, extra) = carry_through(&scope, &projection, &rebound_later);
                if !extra.is_empty() {
                    let joined: String = extra.iter().map(|e| format!(", {e}")).collect();
                    insertions.insert(clause.end - 1, joined);
                }
                scope = next;
            }
            _ => {}
        }
    }

    Some(ExtractionQuery {
        text: render(&tokens, &insertions),
        variables,
    })
}

fn render(tokens: &[Token<'_>], insertions: &BTreeMap<usize, String>) -> String {
    let mut out = String::new();
    for (i, t) in tokens.iter().enumerate() {
        if i > 0 {
            match t.gap {
                Gap::Newline => out.push('\n'),
                Gap::Space => out.push(' '),
                Gap::None => {}
            }
        }
        out.push_str(t.text);
        if let Some(extra) = insertions.get(&i) {
            out.push_str(extra);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(q: &str) -> Vec<(TokenKind, &str)> {
        lex(q).unwrap().into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn lexes_strings_params_comments() {
        assert_eq!(
            kinds("MATCH (n {name: 'O\\'Neil'}) // trailing\nRETURN n.`weird name`, $p1, 1.5"),
            vec![
                (TokenKind::Ident, "MATCH"),
                (TokenKind::Punct, "("),
                (TokenKind::Ident, "n"),
                (TokenKind::Punct, "{"),
                (TokenKind::Ident, "name"),
                (TokenKind::Punct, ":"),
                (TokenKind::Str, "'O\\'Neil'"),
                (TokenKind::Punct, "}"),
                (TokenKind::Punct, ")"),
                (TokenKind::Ident, "RETURN"),
                (TokenKind::Ident, "n"),
                (TokenKind::Punct, "."),
                (TokenKind::Ident, "`weird name`"),
                (TokenKind::Punct, ","),
                (TokenKind::Param, "$p1"),
                (TokenKind::Punct, ","),
                (TokenKind::Number, "1.5"),
            ]
        );
        assert_eq!(kinds("a/* x */->b"), vec![
            (TokenKind::Ident, "a"),
            (TokenKind::Punct, "->"),
            (TokenKind::Ident, "b"),
        ]);
    }

    #[test]
    fn lex_errors() {
        assert!(lex("RETURN 'open").is_err());
        assert!(lex("RETURN 1 /* open").is_err());
        assert_eq!(lex("RETURN #").unwrap_err().offset, 7);
    }

    #[test]
    fn variables_from_match_clauses_only() {
        let q = "MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)\n\
                 MATCH (t:Team {name: $team1})\n\
                 WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (x)-[:HAS_AWAY_TEAM]->(t)\n\
                 RETURN p";
        assert_eq!(pattern_variables(q), vec!["p", "r", "f", "t"]);
    }

    #[test]
    fn path_and_variable_length_relationships() {
        let q = "MATCH path = (a:Team)-[hops*1..3]-(b) RETURN length(path)";
        assert_eq!(pattern_variables(q), vec!["path", "a", "hops", "b"]);
    }

    #[test]
    fn function_arguments_are_not_nodes() {
        let q = "MATCH (p:Player {name: toLower(x)}) RETURN p";
        assert_eq!(pattern_variables(q), vec!["p"]);
    }

    #[test]
    fn aggregating_return_collects() {
        let q = "MATCH (p:Player {player_name: $player1})-[r:PLAYED_IN]->(f:Fixture)\n\
                 MATCH (t:Team {name: $team1})\n\
                 WHERE (f)-[:HAS_HOME_TEAM]->(t) OR (f)-[:HAS_AWAY_TEAM]->(t)\n\
                 RETURN p.player_name AS player, count(f) AS matches_played";
        let x = extraction_query(q).unwrap();
        assert!(x.text.ends_with(
            "count(f) AS matches_played, collect(DISTINCT p) AS p, collect(DISTINCT r) AS r, \
             collect(DISTINCT f) AS f, collect(DISTINCT t) AS t"
        ));
        assert_eq!(x.variables, vec!["p", "r", "f", "t"]);
    }

    #[test]
    fn plain_return_adds_bare_and_renames_collisions() {
        let q = "MATCH (p:Player)-[r:PLAYED_IN]->(f:Fixture)<-[:HAS_FIXTURE]-(gw:Gameweek)\n\
                 RETURN p.player_name AS player, gw.GW_number AS gw\nORDER BY gw LIMIT 5";
        let x = extraction_query(q).unwrap();
        assert!(x.text.contains("gw.GW_number AS gw, p, r, f, gw AS gw_graph\nORDER BY gw LIMIT 5"));
    }

    #[test]
    fn with_scope_is_carried() {
        let q = "MATCH (p:Player)-[r:PLAYED_IN]->(f:Fixture)\n\
                 MATCH (t:Team)\n\
                 WHERE (f)-[:HAS_HOME_TEAM]->(t)\n\
                 WITH t, sum(r.total_points) AS points\n\
                 ORDER BY points DESC\n\
                 SKIP 1 // own team\n\
                 LIMIT 5\n\
                 RETURN t.name AS opponent, points";
        let x = extraction_query(q).unwrap();
        assert!(x.text.contains(
            "WITH t, sum(r.total_points) AS points, collect(DISTINCT p) AS p, \
             collect(DISTINCT r) AS r, collect(DISTINCT f) AS f\nORDER BY"
        ));
        assert!(x.text.ends_with("RETURN t.name AS opponent, points, p, r, f, t"));
        assert!(!x.text.contains("own team"));
    }

    #[test]
    fn lists_are_recollected_by_aggregates_and_rebound_names_are_skipped() {
        let q = "MATCH (p1:Player {player_name: $player1})\n\
                 OPTIONAL MATCH (p1)-[r1:PLAYED_IN]->(:Fixture)\n\
                 WITH $player1 AS player1_name, coalesce(sum(r1.total_points), 0) AS p1_pts\n\
                 MATCH (p2:Player {player_name: $player2})\n\
                 OPTIONAL MATCH (p2)-[r2:PLAYED_IN]->(:Fixture)\n\
                 WITH player1_name, p1_pts, $player2 AS player2_name, coalesce(sum(r2.total_points), 0) AS p2_pts\n\
                 RETURN player1_name AS player1, p1_pts AS player1_points";
        let x = extraction_query(q).unwrap();
        assert!(x.text.contains("AS p1_pts, collect(DISTINCT p1) AS p1, collect(DISTINCT r1) AS r1\n"));
        assert!(x.text.contains(
            "AS p2_pts, collect(DISTINCT p1) AS p1, collect(DISTINCT r1) AS r1, \
             collect(DISTINCT p2) AS p2, collect(DISTINCT r2) AS r2\n"
        ));
        assert!(x.text.ends_with("AS player1_points, p1, r1, p2, r2"));

        let rebound = "MATCH (p:Player) WITH count(p) AS n MATCH (p:Player)-[r:PLAYED_IN]->() RETURN n, r";
        let x = extraction_query(rebound).unwrap();
        assert!(x.text.contains("WITH count(p) AS n MATCH"));
        assert!(x.text.ends_with("RETURN n, r, p"));
    }

    #[test]
    fn carried_lists_never_become_grouping_keys() {
        let q = "MATCH (p:Player)-[r:PLAYED_IN]->(f:Fixture)\n\
                 WITH p, sum(r.total_points) AS pts\n\
                 WITH pts, count(*) AS players\n\
                 RETURN pts, players";
        let x = extraction_query(q).unwrap();
        assert!(x.text.contains(
            "WITH pts, count(*) AS players, collect(DISTINCT p) AS p, \
             collect(DISTINCT r) AS r, collect(DISTINCT f) AS f\n"
        ));
        assert!(x.text.ends_with("RETURN pts, players, p, r, f"));
    }

    #[test]
    fn renamed_and_star_projections() {
        let x = extraction_query("MATCH (p:Player) WITH p AS player RETURN player.name").unwrap();
        assert_eq!(x.text, "MATCH (p:Player) WITH p AS player RETURN player.name, player");

        let x = extraction_query("MATCH (p:Player) WITH * RETURN count(*)").unwrap();
        assert_eq!(x.text, "MATCH (p:Player) WITH * RETURN count(*), collect(DISTINCT p) AS p");
    }

    #[test]
    fn starts_with_is_not_a_clause() {
        let x = extraction_query("MATCH (p:Player) WHERE p.name STARTS WITH 'K' RETURN p.name").unwrap();
        assert!(x.text.ends_with("RETURN p.name, p"));
    }

    #[test]
    fn no_extraction_cases() {
        assert!(extraction_query("RETURN 1").is_none());
        assert!(extraction_query("MATCH (:Player) RETURN count(*)").is_none());
        assert!(extraction_query("MATCH (p:Player)").is_none());
        assert!(extraction_query("MATCH (p) RETURN p UNION MATCH (p) RETURN p").is_none());
        assert!(extraction_query("MATCH (p:Player RETURN p").is_none());
        assert!(extraction_query("MATCH (p) RETURN 'unterminated").is_none());
        assert!(extraction_query("").is_none());
    }
}
