//! Core data types shared across the crate.

pub mod context;
pub mod message;
pub mod response;
pub mod usage;

pub use context::{ContextVariables, CTX_VARS_NAME};
pub use message::{ChatMessage, Role, ToolCallRequest};
pub use response::{RunResponse, ToolOutcome, ToolResult};
pub use usage::TokenUsage;
