//! Graph snapshots streamed by the worker for the visualizer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, node: &GraphNode) -> bool {
        self.nodes.iter().any(|n| n.id == node.id && n.label == node.label)
    }

    pub fn contains_edge(&self, edge: &GraphEdge) -> bool {
        self.edges.iter().any(|e| e.from == edge.from && e.to == edge.to)
    }

    /// Add a node unless one with the same id and label is present.
    pub fn add_node(&mut self, id: impl Into<String>, label: impl Into<String>) -> bool {
        let node = GraphNode {
            id: id.into(),
            label: label.into(),
        };
        if self.contains_node(&node) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Add an edge unless one with the same endpoints is present.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> bool {
        let edge = GraphEdge {
            from: from.into(),
            to: to.into(),
        };
        if self.contains_edge(&edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Append the nodes and edges of `other` that are not already displayed.
    /// Existing entries are never removed or reordered. Returns how many
    /// entries were appended.
    pub fn merge(&mut self, other: &GraphSnapshot) -> usize {
        let mut added = 0;
        for node in &other.nodes {
            if !self.contains_node(node) {
                self.nodes.push(node.clone());
                added += 1;
            }
        }
        for edge in &other.edges {
            if !self.contains_edge(edge) {
                self.edges.push(edge.clone());
                added += 1;
            }
        }
        added
    }
}
