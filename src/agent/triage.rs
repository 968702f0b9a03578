//! Triage agent synthesis and two-way hand-off wiring.

use std::sync::{Arc, OnceLock};

use crate::agent::Agent;
use crate::error::{Result, TychoError};
use crate::tools::{FunctionTool, ToolParameters};
use crate::types::ToolOutcome;

/// Name given to the synthesized dispatcher agent.
pub const TRIAGE_AGENT_NAME: &str = "Triage Agent";

/// Conventional name of the tool that returns control to the dispatcher.
pub const TRANSFER_TO_TRIAGE: &str = "transfer_to_triage";

/// Supplies one specialist agent and a briefing of its capabilities.
pub trait AgentCreator: Send + Sync {
    /// Build the specialist agent.
    fn create_agent(&self) -> Agent;

    /// One-line description used in the triage instructions.
    fn briefing(&self) -> String;
}

/// Synthesizes a triage agent from a set of specialist creators.
///
/// The triage agent's instructions concatenate every briefing and its tool
/// list carries one hand-off tool per specialist; every specialist gets a
/// `transfer_to_triage` tool back, so hand-off works in both directions.
/// Construction is deterministic for the same creator list and order.
pub struct TriageDispatcher {
    triage: Agent,
    specialists: Vec<Agent>,
}

impl TriageDispatcher {
    /// Build the dispatcher. Fails fast when the creator list is empty.
    pub fn new(creators: &[Arc<dyn AgentCreator>], model: impl Into<String>) -> Result<Self> {
        if creators.is_empty() {
            return Err(TychoError::Configuration(
                "triage dispatcher requires at least one agent creator".into(),
            ));
        }

        // The triage agent does not exist yet when the specialists'
        // return-transfer tools are built; they resolve it through this
        // shared late-bound handle.
        let triage_handle: Arc<OnceLock<Agent>> = Arc::new(OnceLock::new());

        let specialists: Vec<Agent> = creators
            .iter()
            .map(|creator| {
                let handle = triage_handle.clone();
                creator
                    .create_agent()
                    .with_predecessor(TRIAGE_AGENT_NAME)
                    .with_tool(Arc::new(FunctionTool::new(
                        TRANSFER_TO_TRIAGE,
                        "Return the conversation to the triage agent.",
                        ToolParameters::empty(),
                        move |_args, _ctx| {
                            let handle = handle.clone();
                            async move {
                                match handle.get() {
                                    Some(triage) => Ok(ToolOutcome::HandOff(triage.clone())),
                                    None => Err(TychoError::InvalidState(
                                        "triage agent not yet synthesized".into(),
                                    )),
                                }
                            }
                        },
                    )))
            })
            .collect();

        let mut instructions = String::from(
            "You are a triage agent. Decide which specialist can handle the \
             user's request and transfer the conversation by calling that \
             specialist's transfer tool.\n\nAvailable specialists:\n",
        );
        for (specialist, creator) in specialists.iter().zip(creators) {
            instructions.push_str(&format!(
                "- {}: {}\n",
                specialist.name(),
                creator.briefing()
            ));
        }

        let mut triage = Agent::new(TRIAGE_AGENT_NAME, model)
            .with_instructions(instructions)
            .with_successors(specialists.iter().map(|a| a.name().to_string()).collect());
        for specialist in &specialists {
            triage = triage.with_tool(FunctionTool::handoff(
                transfer_tool_name(specialist.name()),
                format!("Transfer the conversation to {}.", specialist.name()),
                specialist.clone(),
            ));
        }

        triage_handle
            .set(triage.clone())
            .map_err(|_| TychoError::InvalidState("triage agent synthesized twice".into()))?;

        Ok(Self {
            triage,
            specialists,
        })
    }

    /// The synthesized triage agent.
    pub fn agent(&self) -> Agent {
        self.triage.clone()
    }

    /// The wired specialist agents, in creator order.
    pub fn specialists(&self) -> &[Agent] {
        &self.specialists
    }
}

/// `transfer_to_<specialist>` tool name for an agent display name.
fn transfer_tool_name(agent_name: &str) -> String {
    let slug: String = agent_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_').to_string();
    format!("transfer_to_{slug}")
}
