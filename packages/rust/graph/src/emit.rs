//! Serializations of an assembled graph.
//!
//! All formats are rendered from the same node and edge maps, so ids match
//! across them.

use rulegraph_shared::{GraphFormat, Result};
use serde_json::{Map, Value, json};

use crate::model::KnowledgeGraph;

/// Render `graph` in `format`.
pub fn render(graph: &KnowledgeGraph, format: GraphFormat) -> Result<String> {
    match format {
        GraphFormat::Attribute => Ok(serde_json::to_string_pretty(&attribute_graph(graph))?),
        GraphFormat::Force => Ok(serde_json::to_string_pretty(&force_graph(graph))?),
        GraphFormat::Graphml => Ok(graphml(graph)),
    }
}

/// File extension for `format`.
pub fn extension(format: GraphFormat) -> &'static str {
    match format {
        GraphFormat::Attribute | GraphFormat::Force => "json",
        GraphFormat::Graphml => "graphml",
    }
}

// ---------------------------------------------------------------------------
// Attribute graph
// ---------------------------------------------------------------------------

/// `{nodes:[{data}], edges:[{data}], style, layout}` as read by
/// attribute-graph viewers.
pub fn attribute_graph(graph: &KnowledgeGraph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes
        .values()
        .map(|node| {
            let mut data: Map<String, Value> = node
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            data.insert("id".into(), json!(node.node_id));
            data.insert("label".into(), json!(node.label));
            data.insert("category".into(), json!(node.category));
            data.insert("type".into(), json!(node.node_type));
            data.insert("filing_relevance".into(), json!(node.filing_relevance));
            json!({ "data": data })
        })
        .collect();

    let edges: Vec<Value> = graph
        .edges
        .values()
        .map(|edge| {
            json!({
                "data": {
                    "id": edge.edge_id,
                    "source": edge.source_node_id,
                    "target": edge.target_node_id,
                    "relationship": edge.relationship,
                    "weight": edge.weight,
                }
            })
        })
        .collect();

    json!({
        "nodes": nodes,
        "edges": edges,
        "style": attribute_style(),
        "layout": {
            "name": "cose",
            "animate": false,
            "nodeRepulsion": 4500,
            "idealEdgeLength": 50,
            "gravity": 250,
            "numIter": 100,
        },
    })
}

fn attribute_style() -> Value {
    let node_style = |node_type: &str, color: &str, shape: &str| {
        json!({
            "selector": format!("node[type=\"{node_type}\"]"),
            "style": { "background-color": color, "shape": shape },
        })
    };
    json!([
        {
            "selector": "node",
            "style": {
                "background-color": "#666",
                "label": "data(label)",
                "text-valign": "center",
                "font-size": "12px",
                "width": "mapData(filing_relevance, 0, 100, 30, 80)",
                "height": "mapData(filing_relevance, 0, 100, 30, 80)",
            },
        },
        node_style("document", "#2ecc71", "rectangle"),
        node_style("legal_reference", "#f39c12", "diamond"),
        node_style("judge", "#e74c3c", "round-rectangle"),
        node_style("department", "#3498db", "round-rectangle"),
        node_style("organization", "#34495e", "hexagon"),
        node_style("filing_question", "#9b59b6", "ellipse"),
        {
            "selector": "edge",
            "style": {
                "width": "mapData(weight, 1, 4, 1, 4)",
                "line-color": "#ccc",
                "target-arrow-shape": "triangle",
                "curve-style": "bezier",
                "label": "data(relationship)",
                "font-size": "8px",
            },
        },
    ])
}

// ---------------------------------------------------------------------------
// Force graph
// ---------------------------------------------------------------------------

/// `{nodes, links, metadata}` as read by force-layout renderers.
pub fn force_graph(graph: &KnowledgeGraph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes
        .values()
        .map(|node| {
            let mut obj: Map<String, Value> = node
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            obj.insert("id".into(), json!(node.node_id));
            obj.insert("label".into(), json!(node.label));
            obj.insert("type".into(), json!(node.node_type));
            obj.insert("group".into(), json!(node.node_type.group()));
            obj.insert("category".into(), json!(node.category));
            obj.insert("filing_relevance".into(), json!(node.filing_relevance));
            Value::Object(obj)
        })
        .collect();

    let links: Vec<Value> = graph
        .edges
        .values()
        .map(|edge| {
            json!({
                "id": edge.edge_id,
                "source": edge.source_node_id,
                "target": edge.target_node_id,
                "relationship": edge.relationship,
                "value": edge.weight,
            })
        })
        .collect();

    json!({
        "nodes": nodes,
        "links": links,
        "metadata": {
            "total_nodes": graph.node_count(),
            "total_edges": graph.edge_count(),
            "node_types": graph.node_type_counts(),
            "edge_types": graph.edge_type_counts(),
        },
    })
}

// ---------------------------------------------------------------------------
// GraphML
// ---------------------------------------------------------------------------

pub fn graphml(graph: &KnowledgeGraph) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
    out.push_str("  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>\n");
    out.push_str("  <key id=\"type\" for=\"node\" attr.name=\"type\" attr.type=\"string\"/>\n");
    out.push_str(
        "  <key id=\"relationship\" for=\"edge\" attr.name=\"relationship\" attr.type=\"string\"/>\n",
    );
    out.push_str(&format!(
        "  <graph id=\"{}\" edgedefault=\"directed\">\n",
        escape_xml(&graph.collection)
    ));

    for node in graph.nodes.values() {
        out.push_str(&format!("    <node id=\"{}\">\n", escape_xml(&node.node_id)));
        out.push_str(&format!(
            "      <data key=\"label\">{}</data>\n",
            escape_xml(&node.label)
        ));
        out.push_str(&format!(
            "      <data key=\"type\">{}</data>\n",
            node.node_type.as_str()
        ));
        out.push_str("    </node>\n");
    }

    for edge in graph.edges.values() {
        out.push_str(&format!(
            "    <edge id=\"{}\" source=\"{}\" target=\"{}\">\n",
            escape_xml(&edge.edge_id),
            escape_xml(&edge.source_node_id),
            escape_xml(&edge.target_node_id)
        ));
        out.push_str(&format!(
            "      <data key=\"relationship\">{}</data>\n",
            edge.relationship.as_str()
        ));
        out.push_str("    </edge>\n");
    }

    out.push_str("  </graph>\n");
    out.push_str("</graphml>\n");
    out
}

pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::GraphCategory;
    use crate::model::{Attributes, EdgeKind, GraphEdge, GraphNode, NodeType};
    use std::collections::BTreeSet;

    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph {
            collection: "civil".into(),
            ..KnowledgeGraph::default()
        };
        for (id, node_type, label) in [
            ("doc_civil_a", NodeType::Document, "Motions & \"Papers\" <draft>"),
            ("org_state_bar", NodeType::Organization, "State Bar"),
        ] {
            let mut attributes = Attributes::new();
            attributes.insert("url".into(), json!("https://courts.test/a"));
            graph.nodes.insert(
                id.into(),
                GraphNode {
                    node_id: id.into(),
                    node_type,
                    label: label.into(),
                    category: GraphCategory::GeneralCivil,
                    filing_relevance: 50,
                    attributes,
                },
            );
        }
        let edge = GraphEdge::new("doc_civil_a", "org_state_bar", EdgeKind::MentionsOrganization);
        graph.edges.insert(edge.edge_id.clone(), edge);
        graph
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(escape_xml("a<b>&'\""), "a&lt;b&gt;&amp;&apos;&quot;");
        let xml = graphml(&sample());
        assert!(xml.contains("Motions &amp; &quot;Papers&quot; &lt;draft&gt;"));
        assert!(xml.contains("<data key=\"relationship\">MENTIONS_ORGANIZATION</data>"));
        assert!(xml.ends_with("</graphml>\n"));
    }

    #[test]
    fn attribute_graph_shape() {
        let value = attribute_graph(&sample());
        let node = &value["nodes"][0]["data"];
        assert_eq!(node["id"], "doc_civil_a");
        assert_eq!(node["type"], "document");
        assert_eq!(node["category"], "General Civil");
        assert_eq!(node["url"], "https://courts.test/a");
        let edge = &value["edges"][0]["data"];
        assert_eq!(edge["relationship"], "MENTIONS_ORGANIZATION");
        assert_eq!(edge["weight"], 1);
        assert_eq!(value["layout"]["name"], "cose");
    }

    #[test]
    fn force_graph_metadata() {
        let value = force_graph(&sample());
        assert_eq!(value["metadata"]["total_nodes"], 2);
        assert_eq!(value["metadata"]["total_edges"], 1);
        assert_eq!(value["metadata"]["node_types"]["organization"], 1);
        assert_eq!(value["links"][0]["value"], 1);
        assert_eq!(value["nodes"][1]["group"], 10);
    }

    #[test]
    fn ids_identical_across_formats() {
        let graph = sample();
        let attribute = attribute_graph(&graph);
        let force = force_graph(&graph);
        let xml = graphml(&graph);

        let attr_ids: BTreeSet<String> = attribute["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["data"]["id"].as_str().unwrap().to_string())
            .collect();
        let force_ids: BTreeSet<String> = force["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(attr_ids, force_ids);
        for id in &attr_ids {
            assert!(xml.contains(&format!("<node id=\"{id}\">")));
        }
        assert_eq!(attribute["edges"][0]["data"]["id"], force["links"][0]["id"]);
    }

    #[test]
    fn render_dispatches() {
        let graph = sample();
        assert!(render(&graph, GraphFormat::Graphml).unwrap().starts_with("<?xml"));
        let json: Value = serde_json::from_str(&render(&graph, GraphFormat::Force).unwrap()).unwrap();
        assert!(json["links"].is_array());
    }
}
