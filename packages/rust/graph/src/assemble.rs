//! Build a [`KnowledgeGraph`] from corpus entries.

use std::collections::BTreeSet;

use rulegraph_shared::{AuthorityType, CorpusEntry, EntityKind, GraphConfig};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::category::{GraphCategory, categorize};
use crate::model::{
    Attributes, EdgeKind, GraphEdge, GraphNode, GraphOverflow, KnowledgeGraph, NodeType, slug,
};

/// Size caps applied after assembly.
#[derive(Debug, Clone, Copy)]
pub struct GraphLimits {
    pub max_nodes: usize,
    pub max_edges: usize,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for GraphLimits {
    fn from(config: &GraphConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            max_edges: config.max_edges,
        }
    }
}

/// Assemble the graph of `collection`.
///
/// Entries are visited in canonical id order, so the graph depends only on
/// the set of entries given.
#[instrument(skip_all, fields(collection = %collection, entries = entries.len()))]
pub fn assemble(collection: &str, entries: &[CorpusEntry], limits: GraphLimits) -> KnowledgeGraph {
    let mut ordered: Vec<&CorpusEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

    let mut builder = Builder {
        graph: KnowledgeGraph {
            collection: collection.to_string(),
            ..KnowledgeGraph::default()
        },
        prefix: slug(collection),
    };
    for entry in ordered {
        builder.add_entry(entry);
    }

    let mut graph = builder.graph;
    graph.overflow = truncate(&mut graph, limits);

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        overflow = graph.overflow.is_some(),
        "graph assembled"
    );
    graph
}

struct Builder {
    graph: KnowledgeGraph,
    prefix: String,
}

impl Builder {
    fn add_entry(&mut self, entry: &CorpusEntry) {
        let relevance = entry.classification.filing_relevance_tier.score();
        let doc_id = self.document_id(entry);
        let c = &entry.classification;

        let mut attributes = Attributes::new();
        attributes.insert("canonical_id".into(), json!(entry.canonical_id));
        attributes.insert("url".into(), json!(entry.document.url));
        attributes.insert("title".into(), json!(entry.document.title));
        attributes.insert("document_type".into(), json!(c.document_type));
        attributes.insert("filing_relevance_tier".into(), json!(c.filing_relevance_tier));
        attributes.insert("procedural_area".into(), json!(c.procedural_area));
        attributes.insert("urgency_level".into(), json!(c.urgency_level));
        attributes.insert("complexity_score".into(), json!(c.complexity_score));
        attributes.insert("confidence_score".into(), json!(c.confidence_score));
        attributes.insert("rule_status".into(), json!(c.rule_status.status));
        attributes.insert("cross_references".into(), json!(entry.cross_references.len()));
        attributes.insert(
            "mandatory_obligations".into(),
            json!(c.obligations.mandatory.len()),
        );
        attributes.insert(
            "word_count".into(),
            json!(entry.document.source_text.split_whitespace().count()),
        );
        attributes.insert("degraded".into(), json!(c.degraded));

        self.graph.nodes.insert(
            doc_id.clone(),
            GraphNode {
                node_id: doc_id.clone(),
                node_type: NodeType::Document,
                label: document_label(entry),
                category: categorize(entry),
                filing_relevance: relevance,
                attributes,
            },
        );

        for reference in &entry.cross_references {
            let target = format!(
                "ref_{}_{}",
                reference.authority_type.slug(),
                slug(&reference.target_identifier.to_lowercase())
            );
            let category = match reference.authority_type {
                AuthorityType::LocalRule => GraphCategory::LocalRules,
                _ => GraphCategory::GeneralCivil,
            };
            self.ensure_node(&target, NodeType::LegalReference, &reference.target_identifier, category, || {
                let mut attrs = Attributes::new();
                attrs.insert("authority_type".into(), json!(reference.authority_type));
                attrs.insert("identifier".into(), json!(reference.target_identifier));
                attrs.insert("family".into(), json!(reference.family));
                attrs
            });
            self.link(&doc_id, &target, EdgeKind::Authority(reference.relationship_type), relevance);
        }

        let entities = &c.entities;
        let judge_ids: Vec<String> = entities
            .judges
            .iter()
            .map(|name| self.entity_node(EntityKind::Judge, name))
            .collect();
        let dept_ids: Vec<String> = entities
            .departments
            .iter()
            .map(|name| self.entity_node(EntityKind::Department, name))
            .collect();
        let org_ids: Vec<String> = entities
            .organizations
            .iter()
            .map(|name| self.entity_node(EntityKind::Organization, name))
            .collect();

        // A department named next to a judge is where that judge's rules apply.
        let dept_kind = if judge_ids.is_empty() {
            EdgeKind::MentionsDepartment
        } else {
            EdgeKind::AppliesToDepartment
        };
        for judge in &judge_ids {
            self.link(&doc_id, judge, EdgeKind::MentionsJudge, relevance);
        }
        for dept in &dept_ids {
            self.link(&doc_id, dept, dept_kind, relevance);
        }
        for judge in &judge_ids {
            for dept in &dept_ids {
                self.link(judge, dept, EdgeKind::PresidesIn, 0);
            }
        }
        for org in &org_ids {
            self.link(&doc_id, org, EdgeKind::MentionsOrganization, relevance);
        }

        for (key, answer) in &c.filing_question_analysis {
            if !answer.answers_question {
                continue;
            }
            let id = format!("question_{}", slug(key));
            self.ensure_node(&id, NodeType::FilingQuestion, key, GraphCategory::FilingProcedures, || {
                let mut attrs = Attributes::new();
                attrs.insert("question".into(), json!(key));
                attrs
            });
            self.link(&doc_id, &id, EdgeKind::AnswersQuestion, relevance);
        }

        debug!(node = %doc_id, "document added to graph");
    }

    /// Id of a document node; a colliding slug gets a fingerprint suffix.
    ///
    /// The `doc_` prefix keeps document ids out of the entity, reference and
    /// question namespaces whatever the collection is called.
    fn document_id(&self, entry: &CorpusEntry) -> String {
        let base = format!("doc_{}_{}", self.prefix, slug(&entry.canonical_id));
        if !self.graph.nodes.contains_key(&base) {
            return base;
        }
        let digest = entry
            .content_fingerprint
            .rsplit(':')
            .next()
            .unwrap_or_default();
        let short: String = digest.chars().take(8).collect();
        let candidate = format!("{base}_{short}");
        if !self.graph.nodes.contains_key(&candidate) {
            return candidate;
        }
        (2..)
            .map(|n| format!("{candidate}_{n}"))
            .find(|id| !self.graph.nodes.contains_key(id))
            .unwrap_or(candidate)
    }

    fn entity_node(&mut self, kind: EntityKind, name: &str) -> String {
        let (prefix, node_type, label, category) = match kind {
            EntityKind::Judge => ("judge", NodeType::Judge, format!("Judge {name}"), GraphCategory::JudgeSpecific),
            EntityKind::Department => (
                "dept",
                NodeType::Department,
                format!("Department {name}"),
                GraphCategory::DepartmentSpecific,
            ),
            EntityKind::Organization => ("org", NodeType::Organization, name.to_string(), GraphCategory::GeneralCivil),
        };
        let id = format!("{prefix}_{}", slug(name));
        self.ensure_node(&id, node_type, &label, category, || {
            let mut attrs = Attributes::new();
            attrs.insert("name".into(), json!(name));
            attrs
        });
        id
    }

    fn ensure_node(
        &mut self,
        id: &str,
        node_type: NodeType,
        label: &str,
        category: GraphCategory,
        attributes: impl FnOnce() -> Attributes,
    ) {
        if self.graph.nodes.contains_key(id) {
            return;
        }
        self.graph.nodes.insert(
            id.to_string(),
            GraphNode {
                node_id: id.to_string(),
                node_type,
                label: label.to_string(),
                category,
                filing_relevance: 0,
                attributes: attributes(),
            },
        );
    }

    /// Add an edge (once) and lift the target's relevance to `relevance`.
    fn link(&mut self, source: &str, target: &str, kind: EdgeKind, relevance: u32) {
        let edge = GraphEdge::new(source, target, kind);
        self.graph.edges.entry(edge.edge_id.clone()).or_insert(edge);
        if let Some(node) = self.graph.nodes.get_mut(target) {
            node.filing_relevance = node.filing_relevance.max(relevance);
        }
    }
}

fn document_label(entry: &CorpusEntry) -> String {
    let title = entry.document.title.trim();
    if title.is_empty() {
        entry.canonical_id.clone()
    } else {
        title.to_string()
    }
}

/// Enforce `limits`, returning what was dropped.
///
/// Nodes are kept by relevance (ties by id); edges touching a dropped node
/// go with it. Remaining edges are kept by weight, then the combined
/// relevance of their endpoints, then id.
fn truncate(graph: &mut KnowledgeGraph, limits: GraphLimits) -> Option<GraphOverflow> {
    let nodes_before = graph.nodes.len();
    let edges_before = graph.edges.len();
    if nodes_before <= limits.max_nodes && edges_before <= limits.max_edges {
        return None;
    }

    if nodes_before > limits.max_nodes {
        let mut ranked: Vec<(&String, u32)> = graph
            .nodes
            .iter()
            .map(|(id, n)| (id, n.filing_relevance))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let keep: BTreeSet<String> = ranked
            .into_iter()
            .take(limits.max_nodes)
            .map(|(id, _)| id.clone())
            .collect();
        graph.nodes.retain(|id, _| keep.contains(id));
        graph
            .edges
            .retain(|_, e| keep.contains(&e.source_node_id) && keep.contains(&e.target_node_id));
    }

    if graph.edges.len() > limits.max_edges {
        let relevance = |id: &str| graph.nodes.get(id).map_or(0, |n| n.filing_relevance);
        let mut ranked: Vec<(String, u32, u32)> = graph
            .edges
            .values()
            .map(|e| {
                (
                    e.edge_id.clone(),
                    e.weight,
                    relevance(&e.source_node_id) + relevance(&e.target_node_id),
                )
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        let keep: BTreeSet<String> = ranked
            .into_iter()
            .take(limits.max_edges)
            .map(|(id, _, _)| id)
            .collect();
        graph.edges.retain(|id, _| keep.contains(id));
    }

    let overflow = GraphOverflow {
        max_nodes: limits.max_nodes,
        max_edges: limits.max_edges,
        nodes_before,
        edges_before,
        nodes_dropped: nodes_before - graph.nodes.len(),
        edges_dropped: edges_before - graph.edges.len(),
    };
    warn!(
        nodes_dropped = overflow.nodes_dropped,
        edges_dropped = overflow.edges_dropped,
        max_nodes = limits.max_nodes,
        max_edges = limits.max_edges,
        "graph exceeds limits, lowest-ranked elements dropped"
    );
    Some(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rulegraph_shared::{
        Classification, CrossReference, FilingQuestionAnswer, FilingRelevanceTier, RawDocument,
        RelationshipType,
    };

    fn entry(id: &str, tier: FilingRelevanceTier, refs: &[(AuthorityType, &str)]) -> CorpusEntry {
        let classification = Classification {
            filing_relevance_tier: tier,
            ..Classification::default()
        };
        CorpusEntry {
            canonical_id: id.into(),
            document: RawDocument {
                identifier: id.into(),
                title: format!("Rule {id}"),
                url: format!("https://courts.test/{id}"),
                source_text: "Plain text.".into(),
                discovered_at: Utc::now(),
            },
            classification,
            cross_references: refs
                .iter()
                .map(|(authority, target)| CrossReference {
                    source_document_id: id.into(),
                    target_identifier: (*target).into(),
                    authority_type: *authority,
                    relationship_type: RelationshipType::ReferencedProcedure,
                    family: "test".into(),
                    snippets: Vec::new(),
                })
                .collect(),
            content_fingerprint: format!("sha256:{id}abcdef0123456789"),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn shared_reference_fans_in() {
        let entries = vec![
            entry("a", FilingRelevanceTier::High, &[(AuthorityType::CourtRule, "3.1350")]),
            entry("b", FilingRelevanceTier::Low, &[(AuthorityType::CourtRule, "3.1350")]),
            entry("c", FilingRelevanceTier::Medium, &[(AuthorityType::CourtRule, "3.1350")]),
        ];
        let graph = assemble("civil", &entries, GraphLimits::default());

        let refs: Vec<_> = graph.nodes_of(NodeType::LegalReference).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node_id, "ref_court_rule_3_1350");
        assert_eq!(graph.inbound("ref_court_rule_3_1350").count(), 3);
        // Takes the highest relevance among linking documents.
        assert_eq!(refs[0].filing_relevance, 70);
        assert!(graph.nodes.contains_key("doc_civil_a"));
        assert!(
            graph
                .edges
                .contains_key("doc_civil_a:REFERENCED_PROCEDURE:ref_court_rule_3_1350")
        );
    }

    #[test]
    fn assembly_is_input_order_independent() {
        let a = entry("a", FilingRelevanceTier::High, &[(AuthorityType::Statute, "1013")]);
        let b = entry("b", FilingRelevanceTier::Low, &[(AuthorityType::Statute, "1013")]);
        let one = assemble("civil", &[a.clone(), b.clone()], GraphLimits::default());
        let two = assemble("civil", &[b, a], GraphLimits::default());
        assert_eq!(one, two);
    }

    #[test]
    fn slug_collisions_get_fingerprint_suffix() {
        let first = entry("LR-3.2", FilingRelevanceTier::High, &[]);
        let mut second = entry("lr 3 2", FilingRelevanceTier::High, &[]);
        second.content_fingerprint = "sha256:deadbeefcafef00d".into();

        let graph = assemble("civil", &[second, first], GraphLimits::default());
        // "LR-3.2" sorts first and keeps the plain id.
        assert_eq!(graph.nodes["doc_civil_lr_3_2"].attributes["canonical_id"], "LR-3.2");
        assert_eq!(
            graph.nodes["doc_civil_lr_3_2_deadbeef"].attributes["canonical_id"],
            "lr 3 2"
        );
        assert_eq!(graph.nodes_of(NodeType::Document).count(), 2);
    }

    #[test]
    fn entities_and_questions() {
        let mut e = entry("a", FilingRelevanceTier::VeryHigh, &[]);
        e.classification.entities.judges = vec!["Chen".into()];
        e.classification.entities.departments = vec!["14".into()];
        e.classification.entities.organizations = vec!["Judicial Council".into()];
        e.classification.filing_question_analysis.insert(
            "when_timing".into(),
            FilingQuestionAnswer {
                answers_question: true,
                ..FilingQuestionAnswer::default()
            },
        );
        e.classification
            .filing_question_analysis
            .insert("where_venue".into(), FilingQuestionAnswer::default());

        let graph = assemble("civil", &[e], GraphLimits::default());
        for id in [
            "doc_civil_a:MENTIONS_JUDGE:judge_chen",
            "doc_civil_a:APPLIES_TO_DEPARTMENT:dept_14",
            "judge_chen:PRESIDES_IN:dept_14",
            "doc_civil_a:MENTIONS_ORGANIZATION:org_judicial_council",
            "doc_civil_a:ANSWERS_QUESTION:question_when_timing",
        ] {
            assert!(graph.edges.contains_key(id), "missing {id}");
        }
        assert!(!graph.nodes.contains_key("question_where_venue"));
        assert_eq!(graph.nodes["judge_chen"].label, "Judge Chen");
        assert_eq!(graph.nodes["judge_chen"].filing_relevance, 90);
        assert_eq!(graph.edges["judge_chen:PRESIDES_IN:dept_14"].weight, 4);
    }

    #[test]
    fn department_without_judge_is_a_mention() {
        let mut e = entry("a", FilingRelevanceTier::Low, &[]);
        e.classification.entities.departments = vec!["3B".into()];
        let graph = assemble("civil", &[e], GraphLimits::default());
        assert!(graph.edges.contains_key("doc_civil_a:MENTIONS_DEPARTMENT:dept_3b"));
    }

    #[test]
    fn overflow_keeps_most_relevant_nodes() {
        let entries = vec![
            entry("a", FilingRelevanceTier::VeryHigh, &[(AuthorityType::Statute, "1")]),
            entry("b", FilingRelevanceTier::Low, &[(AuthorityType::Statute, "2")]),
            entry("c", FilingRelevanceTier::High, &[]),
        ];
        let limits = GraphLimits {
            max_nodes: 3,
            max_edges: 10,
        };
        let graph = assemble("civil", &entries, limits);

        // a (90), ref_statute_1 (90), c (70) survive; b and its ref go.
        let kept: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["doc_civil_a", "doc_civil_c", "ref_statute_1"]);
        assert_eq!(graph.edge_count(), 1);

        let overflow = graph.overflow.unwrap();
        assert_eq!(overflow.nodes_before, 5);
        assert_eq!(overflow.nodes_dropped, 2);
        assert_eq!(overflow.edges_dropped, 1);
    }

    #[test]
    fn edge_cap_keeps_heaviest() {
        let mut e = entry("a", FilingRelevanceTier::High, &[(AuthorityType::Statute, "1")]);
        e.classification.entities.judges = vec!["Chen".into()];
        e.classification.entities.organizations = vec!["State Bar".into()];
        let limits = GraphLimits {
            max_nodes: 100,
            max_edges: 2,
        };
        let graph = assemble("civil", &[e], limits);
        let kept: Vec<&str> = graph.edges.keys().map(String::as_str).collect();
        assert_eq!(
            kept,
            vec![
                "doc_civil_a:MENTIONS_JUDGE:judge_chen",
                "doc_civil_a:REFERENCED_PROCEDURE:ref_statute_1",
            ]
        );
        assert_eq!(graph.overflow.unwrap().edges_dropped, 1);
    }

    #[test]
    fn within_limits_reports_no_overflow() {
        let graph = assemble("civil", &[entry("a", FilingRelevanceTier::Low, &[])], GraphLimits::default());
        assert!(graph.overflow.is_none());
        assert_eq!(graph.nodes_of(NodeType::Document).count(), 1);
    }

    #[test]
    fn collection_named_like_an_entity_kind_keeps_namespaces_apart() {
        for collection in ["judge", "dept", "org", "ref_statute", "question"] {
            let a = entry("a", FilingRelevanceTier::High, &[(AuthorityType::Statute, "b")]);
            let mut b = entry("b", FilingRelevanceTier::High, &[]);
            b.classification.entities.judges = vec!["A".into()];
            b.classification.entities.departments = vec!["B".into()];
            b.classification.entities.organizations = vec!["A".into()];
            b.classification.filing_question_analysis.insert(
                "a".into(),
                FilingQuestionAnswer {
                    answers_question: true,
                    ..FilingQuestionAnswer::default()
                },
            );

            let graph = assemble(collection, &[a, b], GraphLimits::default());
            assert_eq!(graph.nodes_of(NodeType::Document).count(), 2, "{collection}");
            assert_eq!(graph.nodes_of(NodeType::Judge).count(), 1, "{collection}");
            assert_eq!(graph.nodes_of(NodeType::Department).count(), 1, "{collection}");
            assert_eq!(graph.nodes_of(NodeType::Organization).count(), 1, "{collection}");
            assert_eq!(graph.nodes_of(NodeType::LegalReference).count(), 1, "{collection}");
            assert_eq!(graph.nodes_of(NodeType::FilingQuestion).count(), 1, "{collection}");

            let doc_b = format!("doc_{collection}_b");
            assert!(graph.edges.contains_key(&format!("{doc_b}:MENTIONS_JUDGE:judge_a")));
            assert_eq!(graph.nodes["judge_a"].node_type, NodeType::Judge);
        }
    }
}
