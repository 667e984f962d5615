//! Shape checks for mind-map JSON returned by a language model.
//!
//! Two policies are offered:
//! - [`coerce_lenient`] accepts anything that looks like a root node (an
//!   object with a usable `label`) and quietly repairs or drops the parts
//!   underneath it that do not fit.
//! - [`validate_strict`] walks the whole tree and rejects it with the path of
//!   the first offending node.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::MindMapNode;

/// A structural problem found by [`validate_strict`].
///
/// `path` uses a JSONPath-like notation: `$` for the root,
/// `$.children[1].children[0]` for nested nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeValidationError {
    #[error("{path}: expected an object, found {found}")]
    NotAnObject { path: String, found: &'static str },

    #[error("{path}: missing \"label\"")]
    MissingLabel { path: String },

    #[error("{path}: \"label\" must be a non-empty string")]
    InvalidLabel { path: String },

    #[error("{path}: \"id\" must be a string")]
    InvalidId { path: String },

    #[error("{path}: \"children\" must be an array")]
    InvalidChildren { path: String },
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validate the full recursive shape of a mind-map and convert it.
pub fn validate_strict(value: &Value) -> Result<MindMapNode, TreeValidationError> {
    validate_at(value, "$".to_string())
}

fn validate_at(value: &Value, path: String) -> Result<MindMapNode, TreeValidationError> {
    let Value::Object(map) = value else {
        return Err(TreeValidationError::NotAnObject {
            found: json_type(value),
            path,
        });
    };

    let label = match map.get("label") {
        None => return Err(TreeValidationError::MissingLabel { path }),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => return Err(TreeValidationError::InvalidLabel { path }),
    };

    let id = match map.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(TreeValidationError::InvalidId { path }),
    };

    let children = match map.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, child)| validate_at(child, format!("{path}.children[{i}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(TreeValidationError::InvalidChildren { path }),
    };

    Ok(MindMapNode {
        id,
        label,
        children,
    })
}

/// Best-effort conversion of model output into a mind-map.
///
/// Returns `None` when the root itself is unusable (not an object, no
/// `label` key, or a label that is not a non-empty string). Below the root,
/// numeric ids are stringified, other ids are discarded, a non-array
/// `children` is treated as empty, and children that are themselves unusable
/// are dropped.
pub fn coerce_lenient(value: &Value) -> Option<MindMapNode> {
    coerce_at(value, "$")
}

fn coerce_at(value: &Value, path: &str) -> Option<MindMapNode> {
    let map = value.as_object()?;
    let label = map
        .get("label")?
        .as_str()
        .filter(|s| !s.trim().is_empty())?
        .to_string();

    let id = match map.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let children = match map.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                let child_path = format!("{path}.children[{i}]");
                let node = coerce_at(child, &child_path);
                if node.is_none() {
                    warn!(path = %child_path, "dropping malformed mind-map node");
                }
                node
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(MindMapNode {
        id,
        label,
        children,
    })
}
