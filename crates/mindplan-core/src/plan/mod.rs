//! Plan generation: prompting a language model for a mind-map and turning
//! its reply into a [`MindMapNode`](crate::mindmap::MindMapNode).

pub mod generate;
pub mod prompt;

pub use generate::{PlanError, PlanGenerator, TreeValidation, strip_code_fences};
pub use prompt::SYSTEM_PROMPT;
