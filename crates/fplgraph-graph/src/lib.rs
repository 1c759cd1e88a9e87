//! FPLGraph graph model.
//!
//! Everything between "the store returned some topology" and "the UI draws
//! it":
//!
//! - [`model`]: raw nodes/relationships and per-strategy [`GraphFragment`]s
//! - [`canonical`]: folds fragments from several strategies into one
//!   [`CanonicalGraph`] using strategy-independent merge keys
//! - [`projector`]: pure mapping to presentation objects
//! - [`html`]: a standalone page for a projected graph

pub mod canonical;
pub mod html;
pub mod model;
pub mod projector;

pub use canonical::{
    CanonicalEdge, CanonicalGraph, CanonicalNode, Canonicalizer, MergeKeyPolicy, NaturalKeyPolicy,
};
pub use html::render_html;
pub use model::{GraphFragment, Properties, RawEdge, RawNode};
pub use projector::{project, VisEdge, VisGraph, VisNode};
