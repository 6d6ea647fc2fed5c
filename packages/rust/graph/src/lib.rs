//! Knowledge-graph assembly for rulegraph.
//!
//! [`assemble`] turns corpus entries into a [`KnowledgeGraph`] of documents,
//! the authorities they cite, the judges, departments and organizations they
//! name, and the filing questions they answer. Node and edge ids are pure
//! functions of what they stand for, so reruns over the same corpus produce
//! the same graph. [`write_outputs`] renders it in every configured
//! [`GraphFormat`](rulegraph_shared::GraphFormat) alongside a
//! [`GraphAnalysis`] report.

pub mod analysis;
pub mod assemble;
pub mod category;
pub mod emit;
pub mod model;
pub mod output;

pub use analysis::{GraphAnalysis, GraphStatistics, Priority, Recommendation, RecommendationKind, analyze};
pub use assemble::{GraphLimits, assemble};
pub use category::{GraphCategory, categorize};
pub use emit::render;
pub use model::{EdgeKind, GraphEdge, GraphNode, GraphOverflow, KnowledgeGraph, NodeType, slug};
pub use output::{base_filename, write_outputs};
