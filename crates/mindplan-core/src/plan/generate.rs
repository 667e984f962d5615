//! The plan generator: goal in, mind-map out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::prompt::SYSTEM_PROMPT;
use crate::llm::{ChatMessage, ChatRequest, LlmClient, LlmError};
use crate::mindmap::{self, MindMapNode, TreeValidationError};

/// How much of the model's JSON is checked before it is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeValidation {
    /// Accept any object with a usable root label; anything else becomes the
    /// single-node fallback tree. Parse problems never reach the caller.
    #[default]
    Lenient,
    /// Validate the whole tree and report structural problems as errors.
    Strict,
}

/// Errors from [`PlanGenerator::generate_plan`].
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("goal must not be empty")]
    EmptyGoal,

    #[error("language model request failed: {0}")]
    Provider(#[from] LlmError),

    /// Strict mode only.
    #[error("model output is not valid JSON: {0}")]
    Unparseable(#[source] serde_json::Error),

    /// Strict mode only.
    #[error("model output is not a valid mind map: {0}")]
    InvalidTree(#[from] TreeValidationError),
}

/// Strip markdown code-fence markers (```` ```json ```` and ```` ``` ````)
/// wherever they appear, then trim surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Turns goals into mind-maps using a language model.
#[derive(Clone)]
pub struct PlanGenerator {
    client: Arc<dyn LlmClient>,
    validation: TreeValidation,
}

impl std::fmt::Debug for PlanGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("model", &self.client.model())
            .field("validation", &self.validation)
            .finish()
    }
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn LlmClient>, validation: TreeValidation) -> Self {
        Self { client, validation }
    }

    pub fn validation(&self) -> TreeValidation {
        self.validation
    }

    /// Ask the model to break `goal` down into a tree.
    ///
    /// Provider failures are returned unchanged. In lenient mode the result
    /// always has a non-empty label: unusable output becomes
    /// [`MindMapNode::fallback`] for the goal.
    pub async fn generate_plan(&self, goal: &str) -> Result<MindMapNode, PlanError> {
        if goal.trim().is_empty() {
            return Err(PlanError::EmptyGoal);
        }

        let request = ChatRequest {
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(goal)],
        };

        let content = match self.client.complete(&request).await {
            Ok(content) => content.unwrap_or_else(|| "{}".to_string()),
            Err(e) => {
                error!(error = %e, model = self.client.model(), "plan generation failed");
                return Err(e.into());
            }
        };

        let cleaned = strip_code_fences(&content);
        let root = match self.validation {
            TreeValidation::Lenient => parse_lenient(&cleaned, goal),
            TreeValidation::Strict => parse_strict(&cleaned)?,
        };

        info!(
            nodes = root.node_count(),
            depth = root.depth(),
            "generated plan"
        );
        Ok(root)
    }
}

fn parse_lenient(cleaned: &str, goal: &str) -> MindMapNode {
    let value = match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, content = %cleaned, "failed to parse model output as JSON");
            return MindMapNode::fallback(goal);
        }
    };

    match mindmap::coerce_lenient(&value) {
        Some(root) => root,
        None => {
            warn!(content = %cleaned, "model output has no usable root label");
            MindMapNode::fallback(goal)
        }
    }
}

fn parse_strict(cleaned: &str) -> Result<MindMapNode, PlanError> {
    let value: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, content = %cleaned, "failed to parse model output as JSON");
        PlanError::Unparseable(e)
    })?;

    mindmap::validate_strict(&value).map_err(|e| {
        warn!(error = %e, content = %cleaned, "model output failed tree validation");
        PlanError::InvalidTree(e)
    })
}
