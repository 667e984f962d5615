//! Client side of the RPC boundary.
//!
//! [`TodoApi`] and [`PlanApi`] are the seams the board talks through;
//! [`RpcClient`] implements both over HTTP (`POST {base}/rpc/<procedure>`).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use mindplan_db::models::Todo;

use crate::mindmap::MindMapNode;

/// Failures calling a remote procedure. The UI layer treats all of them as
/// an opaque error state.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{procedure}: request failed: {source}")]
    Transport {
        procedure: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{procedure}: server returned {status}: {message}")]
    Status {
        procedure: String,
        status: u16,
        message: String,
    },

    #[error("{procedure}: unreadable response: {source}")]
    Decode {
        procedure: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The `todo.*` procedures.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list_todos(&self) -> Result<Vec<Todo>, RpcError>;
    async fn create_todo(&self, text: &str) -> Result<Todo, RpcError>;
    async fn toggle_todo(&self, id: i32, completed: bool) -> Result<Todo, RpcError>;
    async fn delete_todo(&self, id: i32) -> Result<(), RpcError>;
}

/// The `ai.*` procedures.
#[async_trait]
pub trait PlanApi: Send + Sync {
    async fn generate_plan(&self, goal: &str) -> Result<MindMapNode, RpcError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct CreateInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ToggleInput {
    id: i32,
    completed: bool,
}

#[derive(Serialize)]
struct IdInput {
    id: i32,
}

#[derive(Serialize)]
struct GoalInput<'a> {
    goal: &'a str,
}

/// HTTP client for a running `mindplan serve`.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `procedure` with a JSON input and decode the JSON output.
    pub async fn call<I, O>(&self, procedure: &str, input: &I) -> Result<O, RpcError>
    where
        I: Serialize + ?Sized + Sync,
        O: DeserializeOwned,
    {
        let url = format!("{}/rpc/{procedure}", self.base_url);
        debug!(%url, "rpc call");

        let response = self
            .http
            .post(&url)
            .json(input)
            .send()
            .await
            .map_err(|source| RpcError::Transport {
                procedure: procedure.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(RpcError::Status {
                procedure: procedure.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|source| RpcError::Decode {
            procedure: procedure.to_string(),
            source,
        })
    }

    pub async fn health_check(&self) -> Result<String, RpcError> {
        self.call("healthCheck", &json!({})).await
    }
}

#[async_trait]
impl TodoApi for RpcClient {
    async fn list_todos(&self) -> Result<Vec<Todo>, RpcError> {
        self.call("todo.getAll", &json!({})).await
    }

    async fn create_todo(&self, text: &str) -> Result<Todo, RpcError> {
        self.call("todo.create", &CreateInput { text }).await
    }

    async fn toggle_todo(&self, id: i32, completed: bool) -> Result<Todo, RpcError> {
        self.call("todo.toggle", &ToggleInput { id, completed })
            .await
    }

    async fn delete_todo(&self, id: i32) -> Result<(), RpcError> {
        let _ack: serde_json::Value = self.call("todo.delete", &IdInput { id }).await?;
        Ok(())
    }
}

#[async_trait]
impl PlanApi for RpcClient {
    async fn generate_plan(&self, goal: &str) -> Result<MindMapNode, RpcError> {
        self.call("ai.generatePlan", &GoalInput { goal }).await
    }
}
