//! Summary statistics, insights and recommendations for a graph.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{GraphOverflow, KnowledgeGraph, NodeType};

/// Document relevance at or above this counts as high (`HIGH` tier).
const HIGH_RELEVANCE: u32 = 70;

/// Documents below this have no filing relevance (`NONE` tier).
const LOW_RELEVANCE: u32 = 30;

/// More legal-reference nodes than this warrants a validation pass.
const REFERENCE_VALIDATION_THRESHOLD: usize = 10;

/// Documents with more mandatory provisions than this deserve a summary.
const DENSE_OBLIGATIONS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    pub collection: String,
    pub generated_at: DateTime<Utc>,
    pub graph_statistics: GraphStatistics,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_types: BTreeMap<String, usize>,
    pub edge_types: BTreeMap<String, usize>,
    /// Present when limits forced elements out of the graph.
    pub overflow: Option<GraphOverflow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
    DataGap,
    Validation,
    ContentReview,
    ProcessImprovement,
    GraphLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
    pub priority: Priority,
}

pub fn analyze(graph: &KnowledgeGraph, generated_at: DateTime<Utc>) -> GraphAnalysis {
    GraphAnalysis {
        collection: graph.collection.clone(),
        generated_at,
        graph_statistics: GraphStatistics {
            total_nodes: graph.node_count(),
            total_edges: graph.edge_count(),
            node_types: graph.node_type_counts(),
            edge_types: graph.edge_type_counts(),
            overflow: graph.overflow.clone(),
        },
        key_insights: insights(graph),
        recommendations: recommendations(graph),
    }
}

fn insights(graph: &KnowledgeGraph) -> Vec<String> {
    let mut out = Vec::new();

    let judges = graph.nodes_of(NodeType::Judge).count();
    if judges > 0 {
        out.push(format!("Found {judges} judges with specific procedures or preferences"));
    }
    let departments = graph.nodes_of(NodeType::Department).count();
    if departments > 0 {
        out.push(format!("Identified {departments} court departments with specific rules"));
    }

    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();
    for node in graph.nodes_of(NodeType::Document) {
        *categories.entry(node.category.label()).or_insert(0) += 1;
    }
    let mut top: Vec<(&str, usize)> = categories.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if !top.is_empty() {
        let listed: Vec<String> = top
            .iter()
            .take(3)
            .map(|(cat, n)| format!("{cat} ({n})"))
            .collect();
        out.push(format!("Top document categories: {}", listed.join(", ")));
    }

    let references = graph.edges.values().filter(|e| e.relationship.is_authority()).count();
    if references > 0 {
        out.push(format!(
            "Documents contain {references} cross-references to other legal authorities"
        ));
    }

    let questions = graph.nodes_of(NodeType::FilingQuestion).count();
    if questions > 0 {
        out.push(format!("Documents address {questions} common filing questions"));
    }

    let high = graph
        .nodes_of(NodeType::Document)
        .filter(|n| n.filing_relevance >= HIGH_RELEVANCE)
        .count();
    if high > 0 {
        out.push(format!("{high} documents have high filing relevance"));
    }

    if let Some(overflow) = &graph.overflow {
        out.push(format!(
            "Graph truncated: {} nodes and {} edges dropped to fit limits",
            overflow.nodes_dropped, overflow.edges_dropped
        ));
    }
    out
}

fn recommendations(graph: &KnowledgeGraph) -> Vec<Recommendation> {
    let mut out = Vec::new();

    let judges = graph.nodes_of(NodeType::Judge).count();
    let departments = graph.nodes_of(NodeType::Department).count();
    if judges < departments {
        out.push(Recommendation {
            kind: RecommendationKind::DataGap,
            message: "Some departments may be missing judge-specific information".into(),
            priority: Priority::Medium,
        });
    }

    if graph.nodes_of(NodeType::LegalReference).count() > REFERENCE_VALIDATION_THRESHOLD {
        out.push(Recommendation {
            kind: RecommendationKind::Validation,
            message: "Consider validating cross-references for accuracy and current status".into(),
            priority: Priority::High,
        });
    }

    let documents = graph.nodes_of(NodeType::Document).count();
    let low = graph
        .nodes_of(NodeType::Document)
        .filter(|n| n.filing_relevance < LOW_RELEVANCE)
        .count();
    if documents > 0 && low * 10 > documents * 3 {
        out.push(Recommendation {
            kind: RecommendationKind::ContentReview,
            message: "Many documents have low filing relevance - consider content review".into(),
            priority: Priority::Low,
        });
    }

    let dense = graph
        .nodes_of(NodeType::Document)
        .filter(|n| {
            n.attributes
                .get("mandatory_obligations")
                .and_then(|v| v.as_u64())
                .is_some_and(|count| count > DENSE_OBLIGATIONS)
        })
        .count();
    if dense > 0 {
        out.push(Recommendation {
            kind: RecommendationKind::ProcessImprovement,
            message: format!(
                "{dense} documents contain many mandatory requirements - consider creating summary guides"
            ),
            priority: Priority::Medium,
        });
    }

    if let Some(overflow) = &graph.overflow {
        out.push(Recommendation {
            kind: RecommendationKind::GraphLimits,
            message: format!(
                "Graph exceeded limits ({} nodes, {} edges); raise graph.max_nodes / graph.max_edges to keep everything",
                overflow.max_nodes, overflow.max_edges
            ),
            priority: Priority::High,
        });
    }
    out
}
