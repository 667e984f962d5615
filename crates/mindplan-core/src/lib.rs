//! Core logic for mindplan: turning a free-text goal into a reviewable
//! mind-map plan and committing the selected parts of it as todos.
//!
//! ```text
//! goal --PlanGenerator--> MindMapNode --tree_to_graph--> Graph
//!                                                          |
//!                                                   apply_layout
//!                                                          |
//!                                   SelectionState <-------+
//!                                          |
//!                                   commit_labels --> TodoApi::create_todo (sequential)
//! ```

pub mod board;
pub mod client;
pub mod commit;
pub mod graph;
pub mod llm;
pub mod mindmap;
pub mod plan;
pub mod selection;

pub use board::{Board, BoardError, SmartPhase, ViewMode};
pub use client::{PlanApi, RpcClient, RpcError, TodoApi};
pub use commit::{CommitError, commit_labels};
pub use graph::{Graph, GraphEdge, GraphNode, LayoutConfig, NodeView, Position};
pub use mindmap::MindMapNode;
pub use plan::{PlanError, PlanGenerator, TreeValidation};
pub use selection::{SelectionKey, SelectionState};
