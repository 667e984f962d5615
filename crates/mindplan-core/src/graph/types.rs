use serde::{Deserialize, Serialize};

/// Top-left corner of a node, in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Checkbox state; only meaningful for proposed (smart-mode) nodes.
    pub checked: bool,
    /// Completion state of the backing todo; only set on existing-todo nodes.
    pub completed: bool,
    pub position: Position,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            checked: false,
            completed: false,
            position: Position::default(),
        }
    }
}

/// A directed parent -> child link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// What a renderer needs to draw one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub position: Position,
    /// Whether the node carries a checkbox the user can toggle.
    pub interactive: bool,
    pub checked: bool,
    /// Completed existing todos are drawn with their label struck through.
    pub struck_through: bool,
}

impl NodeView {
    /// Read-only view of a node of the existing-todos graph.
    pub fn read_only(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            position: node.position,
            interactive: false,
            checked: false,
            struck_through: node.completed,
        }
    }
}
