//! Helpers shared by the unit tests of this crate.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use mindplan_core::llm::{ChatRequest, LlmClient, LlmError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or write process environment variables.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub enum Reply {
    Text(&'static str),
    Unavailable,
}

/// Language model that always gives the same answer.
pub struct StubModel(pub Reply);

#[async_trait]
impl LlmClient for StubModel {
    fn model(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<Option<String>, LlmError> {
        match self.0 {
            Reply::Text(text) => Ok(Some(text.to_string())),
            Reply::Unavailable => Err(LlmError::Status {
                status: 503,
                body: "upstream secret detail".to_string(),
            }),
        }
    }
}
