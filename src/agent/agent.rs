//! Agent configuration.

use std::sync::Arc;

use crate::tools::AgentFunction;
use crate::types::ContextVariables;

/// Agent instruction text: static, or a function of context variables
/// evaluated lazily per turn.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Dynamic(Arc<dyn Fn(&ContextVariables) -> String + Send + Sync>),
}

impl Instructions {
    /// Resolve to concrete text for this turn.
    pub fn resolve(&self, context_variables: &ContextVariables) -> String {
        match self {
            Instructions::Static(text) => text.clone(),
            Instructions::Dynamic(f) => f(context_variables),
        }
    }
}

impl std::fmt::Debug for Instructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instructions::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Instructions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Tool-selection policy forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    NoTools,
    Required,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::NoTools => "none",
            ToolChoice::Required => "required",
        }
    }
}

/// A named configuration of instructions, model, and callable tools.
///
/// Agents are cheap to clone (tools are shared behind `Arc`) and treated
/// as immutable once handed to the execution loop.
#[derive(Clone)]
pub struct Agent {
    name: String,
    model: String,
    instructions: Instructions,
    functions: Vec<Arc<dyn AgentFunction>>,
    tool_choice: ToolChoice,
    parallel_tool_calls: bool,
    external_content: bool,
    context_variables: ContextVariables,
    predecessor: Option<String>,
    successors: Vec<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: Instructions::Static("You are a helpful agent.".to_string()),
            functions: Vec::new(),
            tool_choice: ToolChoice::Auto,
            parallel_tool_calls: true,
            external_content: false,
            context_variables: ContextVariables::new(),
            predecessor: None,
            successors: Vec::new(),
        }
    }

    /// Set static instruction text.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Instructions::Static(instructions.into());
        self
    }

    /// Set instructions computed from context variables each turn.
    pub fn with_dynamic_instructions(
        mut self,
        f: impl Fn(&ContextVariables) -> String + Send + Sync + 'static,
    ) -> Self {
        self.instructions = Instructions::Dynamic(Arc::new(f));
        self
    }

    /// Register a tool. Tool dispatch is name-keyed: registering a tool
    /// with an already-present name replaces the earlier one.
    pub fn with_tool(mut self, tool: Arc<dyn AgentFunction>) -> Self {
        self.functions.retain(|f| f.name() != tool.name());
        self.functions.push(tool);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_parallel_tool_calls(mut self, allowed: bool) -> Self {
        self.parallel_tool_calls = allowed;
        self
    }

    /// Wrap user content with the restrict-to-supplied-documents guard.
    pub fn with_external_content(mut self, enabled: bool) -> Self {
        self.external_content = enabled;
        self
    }

    /// Set an agent-level context-variable default.
    pub fn with_context_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context_variables.insert(key, value);
        self
    }

    /// Record the predecessor agent's name (memory filtering only).
    pub fn with_predecessor(mut self, name: impl Into<String>) -> Self {
        self.predecessor = Some(name.into());
        self
    }

    /// Record successor agent names.
    pub fn with_successors(mut self, names: Vec<String>) -> Self {
        self.successors = names;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve instruction text for this turn.
    pub fn instructions(&self, context_variables: &ContextVariables) -> String {
        self.instructions.resolve(context_variables)
    }

    pub fn functions(&self) -> &[Arc<dyn AgentFunction>] {
        &self.functions
    }

    /// Look up a tool by name.
    pub fn function(&self, name: &str) -> Option<&Arc<dyn AgentFunction>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn tool_choice(&self) -> ToolChoice {
        self.tool_choice
    }

    pub fn parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls
    }

    pub fn external_content(&self) -> bool {
        self.external_content
    }

    pub fn context_defaults(&self) -> &ContextVariables {
        &self.context_variables
    }

    pub fn predecessor(&self) -> Option<&str> {
        self.predecessor.as_deref()
    }

    pub fn successors(&self) -> &[String] {
        &self.successors
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("instructions", &self.instructions)
            .field(
                "functions",
                &self.functions.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("tool_choice", &self.tool_choice)
            .field("predecessor", &self.predecessor)
            .finish()
    }
}
