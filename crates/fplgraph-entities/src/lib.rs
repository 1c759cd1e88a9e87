//! FPLGraph entity resolution.
//!
//! Turns a free-text football question into a categorized [`EntityBag`]:
//! players, teams, gameweeks, positions, seasons, statistics and budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ENTITY RESOLUTION                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  utterance ──► EntityResolver ──► EntityBag                  │
//! │                   │    │                                     │
//! │                   │    └── OrgTagger (team spans)            │
//! │                   │                                          │
//! │                   └── Vocabulary ◄── CachedVocabulary        │
//! │                                         ▲                    │
//! │                                         │ refresh on expiry  │
//! │                                   VocabularySource (store)   │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fixed categories (positions, seasons, statistics) are closed enums in
//! [`kinds`]. Teams and players are scored against names read from the
//! graph, with the thresholds in [`fuzz`].

pub mod bag;
pub mod fuzz;
pub mod kinds;
pub mod resolver;
pub mod tagger;
pub mod vocabulary;

pub use bag::{EntityBag, DEFAULT_BUDGET};
pub use kinds::{Position, Season, StatKey};
pub use resolver::{EntityResolver, ResolverError};
pub use tagger::{CapitalizedSpanTagger, OrgTagger};
pub use vocabulary::{CachedVocabulary, StaticVocabulary, Vocabulary, VocabularyError, VocabularySource};
