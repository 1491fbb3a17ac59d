// src/render.rs
use eyre::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::graph::FlowGraph;

/// Columnar node and link arrays in the layout Sankey plotting frontends
/// consume directly (label[i] and color[i] describe node i; link arrays are
/// indexed per edge).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyPayload {
    pub node: SankeyNodes,
    pub link: SankeyLinks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyNodes {
    pub label: Vec<String>,
    pub color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLinks {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
    pub value: Vec<f64>,
    pub color: Vec<String>,
}

impl SankeyPayload {
    pub fn from_graph(graph: &FlowGraph) -> Self {
        let node = SankeyNodes {
            label: graph.nodes.iter().map(|n| n.label.clone()).collect(),
            color: graph.nodes.iter().map(|n| n.color.clone()).collect(),
        };
        let link = SankeyLinks {
            source: graph.edges.iter().map(|e| e.source).collect(),
            target: graph.edges.iter().map(|e| e.target).collect(),
            value: graph.edges.iter().map(|e| e.value).collect(),
            color: graph.edges.iter().map(|e| e.color.clone()).collect(),
        };
        Self { node, link }
    }
}

/// Write the graph as a pretty-printed Sankey payload JSON file.
pub fn write_sankey(graph: &FlowGraph, path: impl AsRef<Path>) -> Result<()> {
    let payload = SankeyPayload::from_graph(graph);
    let json = serde_json::to_string_pretty(&payload)?;
    fs::write(path.as_ref(), json)?;
    info!("💾 Sankey payload written to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FlowEdge, FlowNode};

    fn sample_graph() -> FlowGraph {
        FlowGraph {
            nodes: vec![
                FlowNode {
                    label: "CRV 0x1111...1111".to_string(),
                    color: "rgb(141,211,199)".to_string(),
                },
                FlowNode {
                    label: "CRV USER".to_string(),
                    color: "rgb(141,211,199)".to_string(),
                },
            ],
            edges: vec![FlowEdge {
                source: 0,
                target: 1,
                value: 512.5,
                color: "rgb(141,211,199)".to_string(),
            }],
        }
    }

    #[test]
    fn payload_columns_stay_aligned() {
        let payload = SankeyPayload::from_graph(&sample_graph());
        assert_eq!(payload.node.label.len(), payload.node.color.len());
        assert_eq!(payload.link.source, vec![0]);
        assert_eq!(payload.link.target, vec![1]);
        assert_eq!(payload.link.value, vec![512.5]);
        assert_eq!(payload.node.label[1], "CRV USER");
    }

    #[test]
    fn writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sankey.json");
        write_sankey(&sample_graph(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["node"]["label"][0], "CRV 0x1111...1111");
        assert_eq!(value["link"]["value"][0], 512.5);
        assert_eq!(value["link"]["color"][0], "rgb(141,211,199)");
    }

    #[test]
    fn empty_graph_serializes_empty_columns() {
        let payload = SankeyPayload::from_graph(&FlowGraph::default());
        assert!(payload.node.label.is_empty());
        assert!(payload.link.source.is_empty());
    }
}
