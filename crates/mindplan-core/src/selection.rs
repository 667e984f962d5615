//! Checkbox state for a proposed plan graph.
//!
//! The selection is an insertion-ordered set of keys. A key is in the set
//! exactly when the node(s) it names are checked. By default the key is the
//! node label, so nodes that share a label are checked and unchecked
//! together; [`SelectionKey::NodeId`] keys by node id instead.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphNode, NodeView};

/// What identifies a selectable item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKey {
    /// Nodes with equal labels form one selectable item.
    #[default]
    Label,
    /// Every node id is its own selectable item.
    NodeId,
}

impl SelectionKey {
    fn of<'a>(&self, node: &'a GraphNode) -> &'a str {
        match self {
            Self::Label => &node.label,
            Self::NodeId => &node.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    graph: Graph,
    selected: IndexSet<String>,
    key: SelectionKey,
}

impl SelectionState {
    /// Start with every node checked and selected, in node order.
    pub fn new(mut graph: Graph, key: SelectionKey) -> Self {
        let mut selected = IndexSet::with_capacity(graph.nodes.len());
        for node in &mut graph.nodes {
            node.checked = true;
            selected.insert(key.of(node).to_string());
        }
        Self {
            graph,
            selected,
            key,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of selected items (what an "Add Selected (N)" button shows).
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Check or uncheck the item that node `node_id` belongs to.
    ///
    /// Every node sharing the item's key follows. Returns `false` if no node
    /// has that id.
    pub fn toggle(&mut self, node_id: &str, checked: bool) -> bool {
        let Some(node) = self.graph.node(node_id) else {
            return false;
        };
        let item = self.key.of(node).to_string();
        self.set_item(&item, checked);
        true
    }

    fn set_item(&mut self, item: &str, checked: bool) {
        if checked {
            self.selected.insert(item.to_string());
        } else {
            self.selected.shift_remove(item);
        }
        let key = self.key;
        for node in &mut self.graph.nodes {
            if key.of(node) == item {
                node.checked = checked;
            }
        }
    }

    /// Whether the item node `node_id` belongs to is selected.
    pub fn is_selected(&self, node_id: &str) -> bool {
        self.graph
            .node(node_id)
            .is_some_and(|node| self.selected.contains(self.key.of(node)))
    }

    /// Texts to commit, in the order the items were (re)selected.
    pub fn selected_labels(&self) -> Vec<String> {
        match self.key {
            SelectionKey::Label => self.selected.iter().cloned().collect(),
            SelectionKey::NodeId => self
                .selected
                .iter()
                .filter_map(|id| self.graph.node(id).map(|n| n.label.clone()))
                .collect(),
        }
    }

    /// Deselect the first `count` items; used after a commit stopped part
    /// way so a retry does not submit them again.
    pub fn mark_committed(&mut self, count: usize) {
        let committed: Vec<String> = self.selected.iter().take(count).cloned().collect();
        for item in committed {
            self.set_item(&item, false);
        }
    }

    /// Render view: every node is interactive, with its checkbox derived
    /// from the current selection.
    pub fn view(&self) -> Vec<NodeView> {
        self.graph
            .nodes
            .iter()
            .map(|node| NodeView {
                id: node.id.clone(),
                label: node.label.clone(),
                position: node.position,
                interactive: true,
                checked: self.selected.contains(self.key.of(node)),
                struck_through: false,
            })
            .collect()
    }
}
