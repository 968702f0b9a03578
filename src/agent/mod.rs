//! Agent configuration and triage dispatch.

mod agent;
pub mod triage;

pub use agent::{Agent, Instructions, ToolChoice};
pub use triage::{AgentCreator, TriageDispatcher, TRANSFER_TO_TRIAGE, TRIAGE_AGENT_NAME};
