//! Language-model client interface.
//!
//! ```text
//! PlanGenerator --complete(ChatRequest)--> &dyn LlmClient
//!                                             |
//!                                   OpenAiClient (POST {base_url}/chat/completions)
//! ```

pub mod openai;
pub mod trait_def;

pub use openai::{LlmConfig, OpenAiClient};
pub use trait_def::{ChatMessage, ChatRequest, LlmClient, LlmError};
