//! Curated re-exports for common usage.

pub use crate::agent::{Agent, AgentCreator, ToolChoice, TriageDispatcher};
pub use crate::config::TychoConfig;
pub use crate::error::{Result, TychoError};
pub use crate::limit::RateLimiter;
pub use crate::manager::{AgentManager, RunEvent, RunOptions};
pub use crate::memory::Memory;
pub use crate::provider::azure::AzureOpenAiProvider;
pub use crate::provider::groq::GroqProvider;
pub use crate::provider::openai::OpenAiProvider;
pub use crate::provider::{CompletionParams, CompletionProvider};
pub use crate::tokens::TokenCounter;
pub use crate::tools::{AgentFunction, FunctionTool, ToolParameters};
pub use crate::types::{
    ChatMessage, ContextVariables, Role, RunResponse, TokenUsage, ToolOutcome, ToolResult,
};
