//! Layered (top-to-bottom) graph layout.
//!
//! Steps, in the usual Sugiyama order:
//! 1. Cycle removal: back edges found by DFS are reversed.
//! 2. Ranking: longest path from the sources (Kahn's algorithm).
//! 3. Ordering: DFS discovery order, refined by barycenter sweeps; the
//!    ordering with the fewest crossings wins.
//! 4. Coordinates: parents are centred over their children, with a minimum
//!    horizontal gap between neighbours in a rank.
//!
//! Only `Vec`s indexed by vertex are iterated, so the result depends solely
//! on the input order of nodes and edges.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use super::types::{Graph, GraphEdge, GraphNode, Position};

const ORDERING_SWEEPS: usize = 4;

/// Fixed geometry of the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Horizontal gap between neighbouring nodes of a rank.
    pub node_sep: f64,
    /// Vertical gap between ranks.
    pub rank_sep: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 50.0,
            node_sep: 50.0,
            rank_sep: 50.0,
        }
    }
}

/// Overwrite the position of every node. Edges are left untouched.
///
/// Edges to unknown nodes and self-loops are ignored. Nodes sharing an id
/// share a position.
pub fn apply_layout(graph: &mut Graph, config: &LayoutConfig) {
    let positions = compute_positions(&graph.nodes, &graph.edges, config);
    for (node, position) in graph.nodes.iter_mut().zip(positions) {
        node.position = position;
    }
}

fn compute_positions(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    config: &LayoutConfig,
) -> Vec<Position> {
    // One vertex per distinct id, numbered in first-seen order.
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let vertex_of_node: Vec<usize> = nodes
        .iter()
        .map(|node| {
            let next = index.len();
            *index.entry(node.id.as_str()).or_insert(next)
        })
        .collect();
    let n = index.len();
    if n == 0 {
        return Vec::new();
    }

    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut seen = HashSet::with_capacity(edges.len());
    for edge in edges {
        let (Some(&s), Some(&t)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            debug!(edge = %edge.id, "skipping edge with unknown endpoint");
            continue;
        };
        if s != t && seen.insert((s, t)) {
            succ[s].push(t);
        }
    }

    let succ = remove_cycles(&succ);
    let pred = predecessors(&succ);
    let rank = longest_path_ranks(&succ, &pred);
    let mut layers = initial_order(&succ, &pred, &rank);
    reduce_crossings(&mut layers, &succ, &pred);
    let centres = assign_x(&layers, &succ, &pred, config);

    let min_x = centres.iter().copied().fold(f64::INFINITY, f64::min);
    let rank_step = config.node_height + config.rank_sep;

    vertex_of_node
        .into_iter()
        .map(|v| Position {
            // Shift so the left-most node starts at x = 0.
            x: centres[v] - min_x,
            y: rank[v] as f64 * rank_step,
        })
        .collect()
}

/// Reverse the back edges found by a DFS over vertices in index order.
fn remove_cycles(succ: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const NEW: u8 = 0;
    const ACTIVE: u8 = 1;
    const DONE: u8 = 2;

    let n = succ.len();
    let mut state = vec![NEW; n];
    let mut back_edges = HashSet::new();

    for start in 0..n {
        if state[start] != NEW {
            continue;
        }
        state[start] = ACTIVE;
        let mut stack = vec![(start, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (v, i) = *top;
            if i < succ[v].len() {
                top.1 += 1;
                let t = succ[v][i];
                match state[t] {
                    NEW => {
                        state[t] = ACTIVE;
                        stack.push((t, 0));
                    }
                    ACTIVE => {
                        back_edges.insert((v, t));
                    }
                    _ => {}
                }
            } else {
                state[v] = DONE;
                stack.pop();
            }
        }
    }

    if back_edges.is_empty() {
        return succ.to_vec();
    }

    let mut acyclic: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (s, targets) in succ.iter().enumerate() {
        for &t in targets {
            if back_edges.contains(&(s, t)) {
                if !succ[t].contains(&s) && !acyclic[t].contains(&s) {
                    acyclic[t].push(s);
                }
            } else if !acyclic[s].contains(&t) {
                acyclic[s].push(t);
            }
        }
    }
    acyclic
}

fn predecessors(succ: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut pred = vec![Vec::new(); succ.len()];
    for (s, targets) in succ.iter().enumerate() {
        for &t in targets {
            pred[t].push(s);
        }
    }
    pred
}

/// Rank = length of the longest path from any source.
fn longest_path_ranks(succ: &[Vec<usize>], pred: &[Vec<usize>]) -> Vec<usize> {
    let n = succ.len();
    let mut in_degree: Vec<usize> = pred.iter().map(Vec::len).collect();
    let mut rank = vec![0usize; n];

    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    while let Some(v) = queue.pop_front() {
        for &t in &succ[v] {
            rank[t] = rank[t].max(rank[v] + 1);
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                queue.push_back(t);
            }
        }
    }
    rank
}

/// Seed each rank's order with DFS discovery order from the sources.
fn initial_order(succ: &[Vec<usize>], pred: &[Vec<usize>], rank: &[usize]) -> Vec<Vec<usize>> {
    let n = succ.len();
    let max_rank = rank.iter().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    let mut visited = vec![false; n];

    // Sources first, then anything left over.
    let starts = (0..n)
        .filter(|&v| pred[v].is_empty())
        .chain(0..n)
        .collect::<Vec<_>>();

    for start in starts {
        if visited[start] {
            continue;
        }
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            layers[rank[v]].push(v);
            stack.extend(succ[v].iter().rev().filter(|&&t| !visited[t]));
        }
    }
    layers
}

fn positions_in_layers(layers: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut pos = vec![0usize; n];
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            pos[v] = i;
        }
    }
    pos
}

/// Crossings between consecutive ranks, counting only edges that span
/// exactly one rank.
fn count_crossings(layers: &[Vec<usize>], succ: &[Vec<usize>]) -> usize {
    let n = succ.len();
    let pos = positions_in_layers(layers, n);
    let mut rank_of = vec![0usize; n];
    for (r, layer) in layers.iter().enumerate() {
        for &v in layer {
            rank_of[v] = r;
        }
    }

    let mut total = 0;
    for (r, layer) in layers.iter().enumerate() {
        let mut segments: Vec<(usize, usize)> = Vec::new();
        for &s in layer {
            for &t in &succ[s] {
                if rank_of[t] == r + 1 {
                    segments.push((pos[s], pos[t]));
                }
            }
        }
        for (i, a) in segments.iter().enumerate() {
            for b in &segments[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    total += 1;
                }
            }
        }
    }
    total
}

/// Reorder `layer` by the mean position of each vertex's neighbours.
/// Vertices without neighbours keep their slot.
fn sort_by_barycenter(layer: &mut [usize], neighbours: &[Vec<usize>], pos: &[usize]) {
    let mut movable: Vec<(f64, usize, usize)> = Vec::new();
    let mut fixed: Vec<Option<usize>> = vec![None; layer.len()];

    for (slot, &v) in layer.iter().enumerate() {
        if neighbours[v].is_empty() {
            fixed[slot] = Some(v);
        } else {
            let sum: usize = neighbours[v].iter().map(|&u| pos[u]).sum();
            movable.push((sum as f64 / neighbours[v].len() as f64, slot, v));
        }
    }
    movable.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut sorted = movable.into_iter().map(|(_, _, v)| v);
    for (slot, entry) in fixed.into_iter().enumerate() {
        layer[slot] = match entry {
            Some(v) => v,
            None => sorted.next().unwrap_or(layer[slot]),
        };
    }
}

fn reduce_crossings(layers: &mut Vec<Vec<usize>>, succ: &[Vec<usize>], pred: &[Vec<usize>]) {
    let n = succ.len();
    let mut best = layers.clone();
    let mut best_crossings = count_crossings(&best, succ);

    for sweep in 0..ORDERING_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        let downward = sweep % 2 == 0;
        let ranks: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        for r in ranks {
            let pos = positions_in_layers(layers, n);
            let neighbours = if downward { pred } else { succ };
            sort_by_barycenter(&mut layers[r], neighbours, &pos);
        }

        let crossings = count_crossings(layers, succ);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }
    *layers = best;
}

/// Move each vertex of `layer` as close to `desired` as the minimum spacing
/// allows: the mean of a left-packed and a right-packed placement.
fn place_layer(layer: &[usize], desired: &[f64], x: &mut [f64], step: f64) {
    let len = layer.len();
    if len == 0 {
        return;
    }
    let mut left = vec![0.0; len];
    for i in 0..len {
        left[i] = if i == 0 {
            desired[i]
        } else {
            desired[i].max(left[i - 1] + step)
        };
    }
    let mut right = vec![0.0; len];
    for i in (0..len).rev() {
        right[i] = if i == len - 1 {
            desired[i]
        } else {
            desired[i].min(right[i + 1] - step)
        };
    }
    for (i, &v) in layer.iter().enumerate() {
        x[v] = (left[i] + right[i]) / 2.0;
    }
}

fn mean_x(vertices: &[usize], x: &[f64]) -> f64 {
    vertices.iter().map(|&v| x[v]).sum::<f64>() / vertices.len() as f64
}

/// Horizontal centre of every vertex.
fn assign_x(
    layers: &[Vec<usize>],
    succ: &[Vec<usize>],
    pred: &[Vec<usize>],
    config: &LayoutConfig,
) -> Vec<f64> {
    let step = config.node_width + config.node_sep;
    let mut x = vec![0.0; succ.len()];
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            x[v] = i as f64 * step;
        }
    }

    centre_parents(layers, succ, &mut x, step);

    // Pull childless vertices under their parents, then re-centre.
    for layer in layers {
        let desired: Vec<f64> = layer
            .iter()
            .map(|&v| {
                if succ[v].is_empty() && !pred[v].is_empty() {
                    mean_x(&pred[v], &x)
                } else {
                    x[v]
                }
            })
            .collect();
        place_layer(layer, &desired, &mut x, step);
    }

    centre_parents(layers, succ, &mut x, step);
    x
}

/// Bottom-up pass placing every vertex with children over their mean.
fn centre_parents(layers: &[Vec<usize>], succ: &[Vec<usize>], x: &mut [f64], step: f64) {
    for layer in layers.iter().rev() {
        let current: &[f64] = x;
        let desired: Vec<f64> = layer
            .iter()
            .map(|&v| {
                if succ[v].is_empty() {
                    current[v]
                } else {
                    mean_x(&succ[v], current)
                }
            })
            .collect();
        place_layer(layer, &desired, x, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::transform::{todos_to_graph, tree_to_graph};
    use crate::mindmap::MindMapNode;

    const EPS: f64 = 1e-9;

    fn tokyo() -> Graph {
        let branches = (0..4)
            .map(|i| {
                MindMapNode::leaf(format!("b{i}"), format!("Branch {i}")).with_children(vec![
                    MindMapNode::leaf(format!("b{i}-1"), format!("Step {i}.1")),
                    MindMapNode::leaf(format!("b{i}-2"), format!("Step {i}.2")),
                ])
            })
            .collect();
        tree_to_graph(&MindMapNode::leaf("root", "Tokyo").with_children(branches))
    }

    fn laid_out(mut graph: Graph) -> Graph {
        apply_layout(&mut graph, &LayoutConfig::default());
        graph
    }

    fn pos(graph: &Graph, id: &str) -> Position {
        graph.node(id).expect("node exists").position
    }

    fn assert_no_overlap(graph: &Graph) {
        let step = 230.0;
        for (i, a) in graph.nodes.iter().enumerate() {
            for b in &graph.nodes[i + 1..] {
                if a.id != b.id && (a.position.y - b.position.y).abs() < EPS {
                    assert!(
                        (a.position.x - b.position.x).abs() >= step - EPS,
                        "{} and {} overlap: {:?} vs {:?}",
                        a.id,
                        b.id,
                        a.position,
                        b.position
                    );
                }
            }
        }
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let graph = laid_out(Graph::default());
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn single_node_sits_at_origin() {
        let graph = laid_out(tree_to_graph(&MindMapNode::fallback("Goal")));
        assert_eq!(graph.nodes[0].position, Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn ranks_follow_tree_depth() {
        let graph = laid_out(tokyo());
        assert_eq!(pos(&graph, "root").y, 0.0);
        for i in 0..4 {
            assert_eq!(pos(&graph, &format!("b{i}")).y, 100.0);
            assert_eq!(pos(&graph, &format!("b{i}-1")).y, 200.0);
            assert_eq!(pos(&graph, &format!("b{i}-2")).y, 200.0);
        }
    }

    #[test]
    fn parents_are_centred_over_children() {
        let graph = laid_out(tokyo());
        let children_mean =
            (0..4).map(|i| pos(&graph, &format!("b{i}")).x).sum::<f64>() / 4.0;
        assert!((pos(&graph, "root").x - children_mean).abs() < EPS);

        for i in 0..4 {
            let a = pos(&graph, &format!("b{i}-1")).x;
            let b = pos(&graph, &format!("b{i}-2")).x;
            assert!((pos(&graph, &format!("b{i}")).x - (a + b) / 2.0).abs() < EPS);
        }
    }

    #[test]
    fn siblings_keep_input_order_without_overlap() {
        let graph = laid_out(tokyo());
        assert_no_overlap(&graph);
        let xs: Vec<f64> = (0..4).map(|i| pos(&graph, &format!("b{i}")).x).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
        let min_x = graph
            .nodes
            .iter()
            .map(|n| n.position.x)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(min_x, 0.0);
    }

    #[test]
    fn layout_is_deterministic() {
        let first = laid_out(tokyo());
        let second = laid_out(tokyo());
        assert_eq!(first, second);
    }

    #[test]
    fn edges_pass_through_unchanged() {
        let before = tokyo();
        let after = laid_out(before.clone());
        assert_eq!(before.edges, after.edges);
    }

    #[test]
    fn disconnected_nodes_share_rank_zero() {
        let graph = laid_out(Graph {
            nodes: vec![GraphNode::new("a", "A"), GraphNode::new("b", "B")],
            edges: vec![],
        });
        assert_eq!(pos(&graph, "a").y, 0.0);
        assert_eq!(pos(&graph, "b").y, 0.0);
        assert_no_overlap(&graph);
    }

    #[test]
    fn cycles_and_dangling_edges_are_tolerated() {
        let edge = |id: &str, s: &str, t: &str| GraphEdge {
            id: id.to_string(),
            source: s.to_string(),
            target: t.to_string(),
        };
        let graph = laid_out(Graph {
            nodes: vec![
                GraphNode::new("a", "A"),
                GraphNode::new("b", "B"),
                GraphNode::new("c", "C"),
            ],
            edges: vec![
                edge("ab", "a", "b"),
                edge("bc", "b", "c"),
                edge("ca", "c", "a"),
                edge("ax", "a", "missing"),
                edge("aa", "a", "a"),
            ],
        });
        assert_eq!(pos(&graph, "a").y, 0.0);
        assert_eq!(pos(&graph, "b").y, 100.0);
        assert_eq!(pos(&graph, "c").y, 200.0);
    }

    #[test]
    fn barycenter_sweep_removes_crossing() {
        // DFS order puts x before y under a, so b -> x crosses a -> y until
        // the second rank is reordered.
        let edge = |s: &str, t: &str| GraphEdge {
            id: format!("e{s}-{t}"),
            source: s.to_string(),
            target: t.to_string(),
        };
        let graph = laid_out(Graph {
            nodes: ["a", "b", "x", "y"]
                .iter()
                .map(|id| GraphNode::new(*id, *id))
                .collect(),
            edges: vec![edge("a", "x"), edge("a", "y"), edge("b", "x")],
        });
        assert_no_overlap(&graph);
        assert!(pos(&graph, "y").x < pos(&graph, "x").x);
        assert!(pos(&graph, "a").x < pos(&graph, "b").x);
    }

    #[test]
    fn todo_fan_out_centres_the_root() {
        use chrono::Utc;
        use mindplan_db::models::Todo;

        let todos: Vec<Todo> = (1..=3)
            .map(|id| Todo {
                id,
                text: format!("Todo {id}"),
                completed: false,
                created_at: Utc::now(),
            })
            .collect();
        let graph = laid_out(todos_to_graph(&todos));
        assert_eq!(pos(&graph, "root").x, pos(&graph, "todo-2").x);
        assert_eq!(pos(&graph, "todo-1").x, 0.0);
        assert_eq!(pos(&graph, "todo-3").x, 460.0);
    }
}
