//! FPLGraph query layer.
//!
//! ```text
//! EntityBag ──► QueryBinder ──► BoundQuery ──► pattern::extraction_query
//!                   ▲                              (topology variant)
//!                   │
//!               Catalog (intent id → template)
//! ```
//!
//! - [`catalog`]: the closed template library and its [`Param`] vocabulary
//! - [`binder`]: positional binding, the season default and structural
//!   token rendering
//! - [`pattern`]: Cypher lexer and extraction-query rewriter
//! - [`intent`]: keyword fallback when no classifier picks intents

pub mod binder;
pub mod catalog;
pub mod intent;
pub mod pattern;

pub use binder::{BindingError, BoundQuery, LimitError, QueryBinder, RowLimit};
pub use catalog::{Catalog, Param, Template};
pub use intent::{classify_local, MAX_LOCAL_INTENTS};
pub use pattern::{extraction_query, pattern_variables, ExtractionQuery};
