//! EntityBag + template id → executable query.
//!
//! Binding is positional (first player → `player1`, second → `player2`, and
//! so on), drops absent values rather than passing nulls, and renders the
//! structural tokens from a closed set of validated literals. A template
//! whose required parameters cannot all be filled yields a [`BindingError`]
//! and nothing runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use fplgraph_entities::{EntityBag, Season, StatKey};

use crate::catalog::{placeholders, Catalog, Param, Template};

// ============================================================================
// Row limit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row limit {0} is outside {min}..={max}", min = RowLimit::MIN, max = RowLimit::MAX)]
pub struct LimitError(pub u32);

/// `LIMIT` literal, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RowLimit(u32);

impl RowLimit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;
    pub const DEFAULT: RowLimit = RowLimit(5);

    pub fn new(n: u32) -> Result<Self, LimitError> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(RowLimit(n))
        } else {
            Err(LimitError(n))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RowLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for RowLimit {
    type Error = LimitError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        RowLimit::new(n)
    }
}

impl From<RowLimit> for u32 {
    fn from(limit: RowLimit) -> u32 {
        limit.0
    }
}

impl fmt::Display for RowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Errors / output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("template {template_id} is missing required parameters: {}", join_params(.missing))]
    Missing {
        template_id: String,
        query_text: String,
        parameters: Map<String, Value>,
        missing: Vec<Param>,
    },

    #[error("invalid value for ${param}: {reason}")]
    InvalidLiteral { param: Param, reason: String },
}

fn join_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A template with every structural token rendered and its bound
/// parameters collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundQuery {
    pub template_id: String,
    pub text: String,
    pub parameters: Map<String, Value>,
}

// ============================================================================
// Binder
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBinder;

impl QueryBinder {
    pub fn bind(
        template_id: &str,
        bag: &EntityBag,
        limit: RowLimit,
    ) -> Result<BoundQuery, BindingError> {
        let template = Catalog::get(template_id)
            .ok_or_else(|| BindingError::UnknownTemplate(template_id.to_string()))?;
        Self::bind_template(template, bag, limit)
    }

    pub fn bind_template(
        template: &Template,
        bag: &EntityBag,
        limit: RowLimit,
    ) -> Result<BoundQuery, BindingError> {
        let mut values = positional_values(bag, limit);

        let mut missing = missing_params(template, &values);
        if missing == [Param::Season] {
            debug!(template = template.id, "season not resolved, using {}", Season::DEFAULT);
            values.push((Param::Season, Value::from(Season::DEFAULT.label())));
            missing = missing_params(template, &values);
        }
        if !missing.is_empty() {
            return Err(BindingError::Missing {
                template_id: template.id.to_string(),
                query_text: template.body.to_string(),
                parameters: values
                    .iter()
                    .map(|(p, v)| (p.name().to_string(), v.clone()))
                    .collect(),
                missing,
            });
        }

        let mut text = template.body.to_string();
        for (param, value) in values.iter().filter(|(p, _)| p.is_structural()) {
            let literal = structural_literal(*param, value)?;
            text = substitute(&text, param.name(), &literal);
        }

        let referenced = placeholders(&text);
        let parameters: Map<String, Value> = values
            .into_iter()
            .filter(|(p, _)| !p.is_structural() && referenced.contains(&p.name()))
            .map(|(p, v)| (p.name().to_string(), v))
            .collect();

        debug!(
            template = template.id,
            params = ?parameters.keys().collect::<Vec<_>>(),
            "bound query"
        );
        Ok(BoundQuery {
            template_id: template.id.to_string(),
            text: text.trim().to_string(),
            parameters,
        })
    }
}

/// Values available from the bag, absent ones omitted.
fn positional_values(bag: &EntityBag, limit: RowLimit) -> Vec<(Param, Value)> {
    let mut out = Vec::new();
    let mut put = |p: Param, v: Option<Value>| {
        if let Some(v) = v {
            out.push((p, v));
        }
    };
    put(Param::Player1, bag.players.first().map(|s| Value::from(s.as_str())));
    put(Param::Player2, bag.players.get(1).map(|s| Value::from(s.as_str())));
    put(Param::Team1, bag.teams.first().map(|s| Value::from(s.as_str())));
    put(Param::Team2, bag.teams.get(1).map(|s| Value::from(s.as_str())));
    put(Param::Position, bag.positions.first().map(|p| Value::from(p.code())));
    put(Param::Gw, bag.gameweeks.first().map(|gw| Value::from(*gw)));
    put(Param::Season, bag.seasons.first().map(|s| Value::from(s.label())));
    put(Param::StatProperty, bag.statistics.first().map(|s| Value::from(s.as_str())));
    put(Param::Limit, Some(Value::from(limit.get())));
    put(Param::Budget, Some(Value::from(bag.effective_budget())));
    out
}

fn missing_params(template: &Template, values: &[(Param, Value)]) -> Vec<Param> {
    template
        .required
        .iter()
        .copied()
        .filter(|p| !values.iter().any(|(have, _)| have == p))
        .collect()
}

fn structural_literal(param: Param, value: &Value) -> Result<String, BindingError> {
    let invalid = |reason: String| BindingError::InvalidLiteral { param, reason };
    match param {
        Param::StatProperty => value
            .as_str()
            .and_then(StatKey::parse)
            .map(|k| k.property().to_string())
            .ok_or_else(|| invalid(format!("`{value}` is not a statistic key"))),
        Param::Limit => {
            let n = value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid(format!("`{value}` is not an integer")))?;
            RowLimit::new(n)
                .map(|l| l.to_string())
                .map_err(|e| invalid(e.to_string()))
        }
        Param::Budget => {
            let b = value
                .as_f64()
                .ok_or_else(|| invalid(format!("`{value}` is not a number")))?;
            if b.is_finite() && b >= 0.0 {
                Ok(format!("{b:.1}"))
            } else {
                Err(invalid(format!("{b} is not a finite non-negative amount")))
            }
        }
        other => Err(invalid(format!("{other} is not substituted into query text"))),
    }
}

/// Replace every `$name` not followed by an identifier character.
pub fn substitute(text: &str, name: &str, literal: &str) -> String {
    let token = format!("${name}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find(&token) {
        let after = &rest[at + token.len()..];
        let continues = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        out.push_str(&rest[..at]);
        out.push_str(if continues { &token } else { literal });
        rest = after;
    }
    out.push_str(rest);
    out
}
