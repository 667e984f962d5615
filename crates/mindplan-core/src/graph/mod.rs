//! Node/edge graphs built from mind-maps or from persisted todos, and the
//! layered layout that positions them.

pub mod layout;
pub mod transform;
mod types;

pub use layout::{LayoutConfig, apply_layout};
pub use transform::{EXISTING_ROOT_ID, EXISTING_ROOT_LABEL, todos_to_graph, tree_to_graph};
pub use types::{Graph, GraphEdge, GraphNode, NodeView, Position};
