//! Writing graph files to disk.

use std::path::{Path, PathBuf};

use rulegraph_shared::{GraphFormat, Result, RuleGraphError};
use tracing::{debug, info, instrument};

use crate::analysis::GraphAnalysis;
use crate::emit::{extension, render};
use crate::model::{KnowledgeGraph, slug};

/// Base name shared by every file of a collection.
pub fn base_filename(collection: &str) -> String {
    format!("{}_knowledge_graph", slug(collection))
}

/// Write `graph` in each of `formats`, plus the analysis report.
///
/// Every file is written to a temp name and renamed into place. Returns
/// the written paths, graph formats first in the order given, analysis last.
#[instrument(skip_all, fields(collection = %collection, dir = %dir.display()))]
pub fn write_outputs(
    graph: &KnowledgeGraph,
    analysis: &GraphAnalysis,
    dir: &Path,
    collection: &str,
    formats: &[GraphFormat],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| RuleGraphError::io(dir, e))?;
    let base = base_filename(collection);

    let mut written = Vec::with_capacity(formats.len() + 1);
    for format in formats {
        let filename = format!("{base}_{}.{}", format.as_str(), extension(*format));
        let content = render(graph, *format)?;
        written.push(write_atomic(dir, &filename, &content)?);
    }

    let analysis_json = serde_json::to_string_pretty(analysis)?;
    written.push(write_atomic(dir, &format!("{base}_analysis.json"), &analysis_json)?);

    info!(files = written.len(), "graph outputs written");
    Ok(written)
}

fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));
    std::fs::write(&temp, content).map_err(|e| RuleGraphError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| RuleGraphError::io(&target, e))?;
    debug!(file = %filename, size = content.len(), "wrote graph file");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use chrono::Utc;

    #[test]
    fn writes_every_format_and_analysis() {
        let dir = std::env::temp_dir().join(format!("rulegraph_graph_{}", uuid::Uuid::now_v7()));
        let graph = KnowledgeGraph {
            collection: "LA Civil".into(),
            ..KnowledgeGraph::default()
        };
        let analysis = analyze(&graph, Utc::now());

        let paths = write_outputs(&graph, &analysis, &dir, "LA Civil", &GraphFormat::ALL).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "la_civil_knowledge_graph_attribute.json",
                "la_civil_knowledge_graph_force.json",
                "la_civil_knowledge_graph_graphml.graphml",
                "la_civil_knowledge_graph_analysis.json",
            ]
        );
        for path in &paths {
            assert!(path.exists());
        }
        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn only_requested_formats() {
        let dir = std::env::temp_dir().join(format!("rulegraph_graph_{}", uuid::Uuid::now_v7()));
        let graph = KnowledgeGraph::default();
        let analysis = analyze(&graph, Utc::now());
        let paths = write_outputs(&graph, &analysis, &dir, "civil", &[GraphFormat::Graphml]).unwrap();
        assert_eq!(paths.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}
