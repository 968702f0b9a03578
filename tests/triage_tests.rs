//! Triage dispatch integration tests.

mod common;

use std::sync::Arc;

use common::MockProvider;

use tycho::agent::{Agent, AgentCreator, TriageDispatcher, TRANSFER_TO_TRIAGE};
use tycho::error::TychoError;
use tycho::manager::AgentManager;
use tycho::memory::Memory;
use tycho::tools::{FunctionTool, ToolParameters};
use tycho::types::ToolOutcome;

struct BillingCreator;

impl AgentCreator for BillingCreator {
    fn create_agent(&self) -> Agent {
        Agent::new("Billing Agent", "gpt-4o")
            .with_instructions("You handle invoices and refunds.")
            .with_tool(Arc::new(FunctionTool::new(
                "lookup_invoice",
                "Look up an invoice by id",
                ToolParameters::object()
                    .string("invoice_id", "Invoice identifier", true)
                    .build(),
                |args, _ctx| async move {
                    let id = args
                        .get("invoice_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    Ok(ToolOutcome::Text(format!("invoice {id}: 42.00 EUR, paid")))
                },
            )))
    }

    fn briefing(&self) -> String {
        "Handles billing questions, invoices, and refunds".to_string()
    }
}

struct ShippingCreator;

impl AgentCreator for ShippingCreator {
    fn create_agent(&self) -> Agent {
        Agent::new("Shipping Agent", "gpt-4o").with_instructions("You track parcels.")
    }

    fn briefing(&self) -> String {
        "Tracks parcels and delivery issues".to_string()
    }
}

fn dispatcher() -> TriageDispatcher {
    let creators: Vec<Arc<dyn AgentCreator>> =
        vec![Arc::new(BillingCreator), Arc::new(ShippingCreator)];
    TriageDispatcher::new(&creators, "gpt-4o").unwrap()
}

#[test]
fn empty_creator_list_fails_construction() {
    let result = TriageDispatcher::new(&[], "gpt-4o");
    assert!(matches!(result, Err(TychoError::Configuration(_))));
}

#[test]
fn dispatcher_is_deterministic_for_same_creators() {
    let a = dispatcher();
    let b = dispatcher();

    let instructions_a = a.agent().instructions(&Default::default());
    let instructions_b = b.agent().instructions(&Default::default());
    assert_eq!(instructions_a, instructions_b);

    let tools_a: Vec<_> = a.agent().functions().iter().map(|t| t.name().to_string()).collect();
    let tools_b: Vec<_> = b.agent().functions().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(tools_a, tools_b);
}

#[tokio::test]
async fn triage_routes_to_specialist_and_specialist_can_return() {
    let provider = Arc::new(MockProvider::new());
    // Turn 1: triage picks billing. Turn 2: billing answers directly.
    provider.queue_tool_calls(&[("call_1", "transfer_to_billing_agent", "{}")]);
    provider.queue_text("Billing here — your invoice is paid.");

    let dispatcher = dispatcher();
    let mut manager = AgentManager::new(provider.clone(), dispatcher.agent());
    let mut memory = Memory::new();

    let response = manager.run("I have a question about my invoice", &mut memory).await;

    assert_eq!(response.agent.name(), "Billing Agent");
    assert!(response.agent.function(TRANSFER_TO_TRIAGE).is_some());
    // The billing turn ran with the specialist's own instructions.
    let requests = provider.requests();
    assert_eq!(
        requests[1].messages[0].content,
        "You handle invoices and refunds."
    );
}

#[tokio::test]
async fn specialist_round_trip_back_to_triage() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_calls(&[("call_1", TRANSFER_TO_TRIAGE, "{}")]);
    provider.queue_text("Triage again. Who else can I connect you with?");

    let dispatcher = dispatcher();
    let billing = dispatcher.specialists()[0].clone();
    let mut manager = AgentManager::new(provider, dispatcher.agent());
    let mut memory = Memory::new();

    let response = manager
        .run_with_options(
            "take me back",
            &mut memory,
            tycho::manager::RunOptions {
                agent: Some(billing),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(response.agent.name(), tycho::agent::TRIAGE_AGENT_NAME);
}

#[tokio::test]
async fn triage_advertises_specialist_schemas_without_reserved_parameter() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_text("hello");

    let dispatcher = dispatcher();
    let mut manager = AgentManager::new(provider.clone(), dispatcher.agent());
    let mut memory = Memory::new();
    manager.run("hi", &mut memory).await;

    let requests = provider.requests();
    assert_eq!(requests[0].tools.len(), 2);
    for tool in &requests[0].tools {
        let properties = tool.parameters.get("properties").unwrap();
        assert!(properties.get("context_variables").is_none());
    }
}
