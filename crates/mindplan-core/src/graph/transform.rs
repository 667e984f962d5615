//! Flattening trees and todo lists into graphs.

use std::collections::HashSet;

use uuid::Uuid;

use mindplan_db::models::Todo;

use super::types::{Graph, GraphEdge, GraphNode};
use crate::mindmap::MindMapNode;

/// Id of the synthetic root of the existing-todos graph.
pub const EXISTING_ROOT_ID: &str = "root";
/// Label of the synthetic root of the existing-todos graph.
pub const EXISTING_ROOT_LABEL: &str = "My Tasks";

fn fallback_id() -> String {
    format!("node-{}", Uuid::new_v4().simple())
}

/// Flatten a mind-map into nodes and edges by depth-first pre-order
/// traversal.
///
/// Every node starts checked. Node ids are unique within the result: a node
/// whose id is missing, empty or already taken by an earlier node gets a
/// fresh UUID-based id. Edge ids are `e{parent}-{child}`.
pub fn tree_to_graph(root: &MindMapNode) -> Graph {
    let mut graph = Graph {
        nodes: Vec::with_capacity(root.node_count()),
        edges: Vec::with_capacity(root.node_count().saturating_sub(1)),
    };

    let mut used: HashSet<String> = HashSet::with_capacity(root.node_count());

    // (node, parent id)
    let mut stack: Vec<(&MindMapNode, Option<String>)> = vec![(root, None)];
    while let Some((node, parent)) = stack.pop() {
        let id = match node.id.as_deref() {
            Some(id) if !id.is_empty() && !used.contains(id) => id.to_string(),
            _ => fallback_id(),
        };
        used.insert(id.clone());

        let mut graph_node = GraphNode::new(id.clone(), node.label.clone());
        graph_node.checked = true;
        graph.nodes.push(graph_node);

        if let Some(parent_id) = parent {
            graph.edges.push(GraphEdge {
                id: format!("e{parent_id}-{id}"),
                source: parent_id,
                target: id.clone(),
            });
        }

        for child in node.children.iter().rev() {
            stack.push((child, Some(id.clone())));
        }
    }

    graph
}

/// Build the read-only graph of persisted todos: a synthetic root fanning
/// out to one node per todo. An empty list yields an empty graph.
pub fn todos_to_graph(todos: &[Todo]) -> Graph {
    if todos.is_empty() {
        return Graph::default();
    }

    let mut graph = Graph {
        nodes: Vec::with_capacity(todos.len() + 1),
        edges: Vec::with_capacity(todos.len()),
    };
    graph
        .nodes
        .push(GraphNode::new(EXISTING_ROOT_ID, EXISTING_ROOT_LABEL));

    for todo in todos {
        let node_id = format!("todo-{}", todo.id);
        let mut node = GraphNode::new(node_id.clone(), todo.text.clone());
        node.completed = todo.completed;
        graph.nodes.push(node);
        graph.edges.push(GraphEdge {
            id: format!("e-{EXISTING_ROOT_ID}-{node_id}"),
            source: EXISTING_ROOT_ID.to_string(),
            target: node_id,
        });
    }

    graph
}
