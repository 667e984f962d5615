//! Turning a reviewed selection into todos.

use thiserror::Error;
use tracing::{info, warn};

use mindplan_db::models::Todo;

use crate::client::{RpcError, TodoApi};

/// A commit that stopped part way. Todos created before the failure are
/// kept; nothing is rolled back.
#[derive(Debug, Error)]
#[error("commit stopped after {} todos; failed on {failed:?}: {source}", .created.len())]
pub struct CommitError {
    pub created: Vec<Todo>,
    pub failed: String,
    /// Labels after `failed` that were never submitted.
    pub remaining: Vec<String>,
    #[source]
    pub source: RpcError,
}

/// Create one todo per label, in order, one request at a time.
///
/// Stops at the first failed create.
pub async fn commit_labels(api: &dyn TodoApi, labels: &[String]) -> Result<Vec<Todo>, CommitError> {
    let mut created = Vec::with_capacity(labels.len());

    for (i, label) in labels.iter().enumerate() {
        match api.create_todo(label).await {
            Ok(todo) => created.push(todo),
            Err(source) => {
                warn!(label = %label, created = created.len(), error = %source, "commit stopped");
                return Err(CommitError {
                    created,
                    failed: label.clone(),
                    remaining: labels[i + 1..].to_vec(),
                    source,
                });
            }
        }
    }

    info!(count = created.len(), "committed plan");
    Ok(created)
}
