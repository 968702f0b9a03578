//! Tycho — agent orchestration over chat-completion LLM APIs.
//!
//! Provides agent definitions, triage dispatch across specialized
//! sub-agents, a tool-calling execution loop (blocking and streaming),
//! conversation memory, token-budget management, and rate/timeout control.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tycho::prelude::*;
//!
//! # async fn example() {
//! let config = TychoConfig::from_env();
//! let provider = Arc::new(OpenAiProvider::from_config(&config).unwrap());
//! let agent = Agent::new("Assistant", "gpt-4o")
//!     .with_instructions("You are a helpful assistant.");
//!
//! let mut manager = AgentManager::new(provider, agent);
//! let mut memory = Memory::new();
//! let response = manager.run("Hello!", &mut memory).await;
//! println!("{}", response.messages.last().unwrap().content);
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod limit;
pub mod manager;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod summarize;
pub mod tokens;
pub mod tools;
pub mod types;
pub mod util;
