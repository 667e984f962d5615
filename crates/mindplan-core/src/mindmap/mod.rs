//! The mind-map tree produced by plan generation, plus the shape checks
//! applied to raw model output.

mod node;
pub mod validate;

pub use node::MindMapNode;
pub use validate::{TreeValidationError, coerce_lenient, validate_strict};
