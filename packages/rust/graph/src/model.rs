//! Graph nodes, edges, and the id scheme that keeps them stable across runs.

use std::collections::BTreeMap;

use rulegraph_shared::RelationshipType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::category::GraphCategory;

/// Free-form node attributes, emitted alongside the fixed fields.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Kind of entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Document,
    LegalReference,
    Judge,
    Department,
    Organization,
    FilingQuestion,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::LegalReference => "legal_reference",
            Self::Judge => "judge",
            Self::Department => "department",
            Self::Organization => "organization",
            Self::FilingQuestion => "filing_question",
        }
    }

    /// Numeric group used by force-layout renderers for coloring.
    pub fn group(&self) -> u32 {
        match self {
            Self::Document => 1,
            Self::Judge => 2,
            Self::Department => 3,
            Self::LegalReference => 4,
            Self::FilingQuestion => 5,
            Self::Organization => 10,
        }
    }
}

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    MentionsJudge,
    PresidesIn,
    AppliesToDepartment,
    MentionsDepartment,
    MentionsOrganization,
    AnswersQuestion,
    /// Document to legal authority, typed by the resolved relationship.
    Authority(RelationshipType),
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MentionsJudge => "MENTIONS_JUDGE",
            Self::PresidesIn => "PRESIDES_IN",
            Self::AppliesToDepartment => "APPLIES_TO_DEPARTMENT",
            Self::MentionsDepartment => "MENTIONS_DEPARTMENT",
            Self::MentionsOrganization => "MENTIONS_ORGANIZATION",
            Self::AnswersQuestion => "ANSWERS_QUESTION",
            Self::Authority(rel) => rel.as_str(),
        }
    }

    /// Fixed weight per relationship kind.
    pub fn weight(&self) -> u32 {
        match self {
            Self::PresidesIn => 4,
            Self::MentionsJudge
            | Self::Authority(RelationshipType::DependsOn)
            | Self::Authority(RelationshipType::Supersedes) => 3,
            Self::AppliesToDepartment
            | Self::AnswersQuestion
            | Self::Authority(RelationshipType::ReferencedProcedure)
            | Self::Authority(RelationshipType::ModifiedBy)
            | Self::Authority(RelationshipType::ExceptionTo)
            | Self::Authority(RelationshipType::Cites) => 2,
            Self::MentionsDepartment | Self::MentionsOrganization | Self::Authority(_) => 1,
        }
    }

    pub fn is_authority(&self) -> bool {
        matches!(self, Self::Authority(_))
    }
}

impl Serialize for EdgeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub node_id: String,
    pub node_type: NodeType,
    pub label: String,
    pub category: GraphCategory,
    /// 0-100, see [`rulegraph_shared::FilingRelevanceTier::score`].
    pub filing_relevance: u32,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub edge_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub relationship: EdgeKind,
    pub weight: u32,
}

impl GraphEdge {
    pub fn new(source: &str, target: &str, relationship: EdgeKind) -> Self {
        Self {
            edge_id: edge_id(source, relationship, target),
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            relationship,
            weight: relationship.weight(),
        }
    }
}

/// Nodes dropped to honor the configured graph limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphOverflow {
    pub max_nodes: usize,
    pub max_edges: usize,
    pub nodes_before: usize,
    pub edges_before: usize,
    pub nodes_dropped: usize,
    pub edges_dropped: usize,
}

/// Assembled graph of one collection.
///
/// Both maps are keyed by id, so iteration (and therefore every emitted
/// format) is in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    pub collection: String,
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: BTreeMap<String, GraphEdge>,
    pub overflow: Option<GraphOverflow>,
}

impl KnowledgeGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_of(&self, node_type: NodeType) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(move |n| n.node_type == node_type)
    }

    /// Edges pointing at `node_id`.
    pub fn inbound(&self, node_id: &str) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values().filter(move |e| e.target_node_id == node_id)
    }

    /// Count of nodes per type name.
    pub fn node_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.node_type.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Count of edges per relationship name.
    pub fn edge_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.edges.values() {
            *counts.entry(edge.relationship.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Lower-case id fragment: ASCII alphanumerics kept, runs of anything else
/// become one `_`. A value with no ASCII alphanumerics at all becomes
/// `unnamed_` plus a short digest of the value, so distinct names stay apart.
pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        let digest = format!("{:x}", Sha256::digest(value.as_bytes()));
        out.push_str("unnamed_");
        out.push_str(&digest[..8]);
    }
    out
}

pub fn edge_id(source: &str, relationship: EdgeKind, target: &str) -> String {
    format!("{source}:{}:{target}", relationship.as_str())
}
