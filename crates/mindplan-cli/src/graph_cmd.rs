use std::collections::HashSet;

use anyhow::Result;

use mindplan_core::{Board, GraphEdge, NodeView, RpcClient, ViewMode};

/// Print the mind-map of existing todos.
pub async fn run_graph(client: &RpcClient) -> Result<()> {
    let mut board = Board::default();
    board.set_view_mode(ViewMode::MindMap);
    board.refresh(client).await?;

    let nodes = board.nodes_view();
    if nodes.is_empty() {
        println!("No todos.");
        return Ok(());
    }
    print!("{}", render_graph(&nodes, board.edges()));
    Ok(())
}

/// Render a laid-out graph as an indented tree.
///
/// Each line carries the node's layout position. Interactive nodes get a
/// checkbox; completed todos are struck through as `~~label~~`. Nodes with no
/// incoming edge start a new tree.
pub fn render_graph(nodes: &[NodeView], edges: &[GraphEdge]) -> String {
    let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
    let mut out = String::new();
    let mut seen = HashSet::new();

    for node in nodes.iter().filter(|n| !targets.contains(n.id.as_str())) {
        render_node(node, nodes, edges, 0, &mut seen, &mut out);
    }
    // Nodes only reachable through a cycle.
    for node in nodes {
        if !seen.contains(node.id.as_str()) {
            render_node(node, nodes, edges, 0, &mut seen, &mut out);
        }
    }
    out
}

fn render_node<'a>(
    node: &'a NodeView,
    nodes: &'a [NodeView],
    edges: &[GraphEdge],
    depth: usize,
    seen: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !seen.insert(node.id.as_str()) {
        return;
    }

    let indent = "  ".repeat(depth);
    let checkbox = match (node.interactive, node.checked) {
        (true, true) => "[x] ",
        (true, false) => "[ ] ",
        (false, _) => "",
    };
    let label = if node.struck_through {
        format!("~~{}~~", node.label)
    } else {
        node.label.clone()
    };
    out.push_str(&format!(
        "{indent}{checkbox}{label}  ({}) @ {},{}\n",
        node.id, node.position.x, node.position.y
    ));

    for edge in edges.iter().filter(|e| e.source == node.id) {
        if let Some(child) = nodes.iter().find(|n| n.id == edge.target) {
            render_node(child, nodes, edges, depth + 1, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use mindplan_core::graph::{apply_layout, todos_to_graph};
    use mindplan_core::{LayoutConfig, NodeView};
    use mindplan_db::models::Todo;

    use super::*;

    fn todo(id: i32, text: &str, completed: bool) -> Todo {
        Todo {
            id,
            text: text.to_string(),
            completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renders_existing_todos_read_only() {
        let mut graph = todos_to_graph(&[todo(1, "Pack", true), todo(2, "Fly", false)]);
        apply_layout(&mut graph, &LayoutConfig::default());
        let nodes: Vec<NodeView> = graph.nodes.iter().map(NodeView::read_only).collect();

        assert_eq!(
            render_graph(&nodes, &graph.edges),
            "My Tasks  (root) @ 115,0\n  ~~Pack~~  (todo-1) @ 0,100\n  Fly  (todo-2) @ 230,100\n"
        );
    }

    #[test]
    fn renders_checkboxes_for_interactive_nodes() {
        let mut a = NodeView::read_only(&mindplan_core::GraphNode::new("a", "A"));
        a.interactive = true;
        a.checked = true;
        let mut b = NodeView::read_only(&mindplan_core::GraphNode::new("b", "B"));
        b.interactive = true;
        let edges = vec![GraphEdge {
            id: "ea-b".to_string(),
            source: "a".to_string(),
            target: "b".to_string(),
        }];

        let out = render_graph(&[a, b], &edges);
        assert_eq!(out, "[x] A  (a) @ 0,0\n  [ ] B  (b) @ 0,0\n");
    }

    #[test]
    fn cycles_are_rendered_once() {
        let a = NodeView::read_only(&mindplan_core::GraphNode::new("a", "A"));
        let b = NodeView::read_only(&mindplan_core::GraphNode::new("b", "B"));
        let edge = |s: &str, t: &str| GraphEdge {
            id: format!("e{s}-{t}"),
            source: s.to_string(),
            target: t.to_string(),
        };
        let out = render_graph(&[a, b], &[edge("a", "b"), edge("b", "a")]);
        assert_eq!(out.lines().count(), 2);
    }
}
