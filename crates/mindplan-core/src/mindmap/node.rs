use serde::{Deserialize, Serialize};

/// A node of a generated plan.
///
/// The model is asked to supply an `id` for every node but is not trusted
/// to; absent ids are filled in when the tree is turned into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    /// A node with an id and no children.
    pub fn leaf(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper that replaces the children of `self`.
    pub fn with_children(mut self, children: Vec<MindMapNode>) -> Self {
        self.children = children;
        self
    }

    /// The single-node tree returned when the model output is unusable:
    /// the goal itself, with nothing underneath it.
    pub fn fallback(goal: &str) -> Self {
        Self::leaf("root", goal)
    }

    /// Total number of nodes in the tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Depth of the tree; a lone root has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Labels in depth-first pre-order.
    pub fn labels_depth_first(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.label.as_str());
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
