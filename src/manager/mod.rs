//! The agent execution loop.

mod dispatch;
mod stream;

pub use stream::RunEvent;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::agent::Agent;
use crate::error::{Result, TychoError};
use crate::limit::RateLimiter;
use crate::memory::Memory;
use crate::provider::{
    ChatCompletion, CompletionParams, CompletionProvider, CompletionRequest, ToolDefinition,
};
use crate::summarize;
use crate::tokens::{default_token_limit, TokenCounter};
use crate::types::{ChatMessage, ContextVariables, Role, RunResponse, TokenUsage};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

/// Prefix applied to user content for agents restricted to supplied documents.
const DOCUMENT_GUARDRAIL_PREFIX: &str =
    "Answer only using information from the supplied documents: ";

/// Per-run options for [`AgentManager::run_with_options`].
#[derive(Clone)]
pub struct RunOptions {
    /// Start with this agent instead of the manager's current one.
    pub agent: Option<Agent>,
    /// Override the agent's model for this run.
    pub model_override: Option<String>,
    /// Sampling parameters forwarded to the provider.
    pub params: CompletionParams,
    /// Turn budget; unbounded when `None`.
    pub max_turns: Option<usize>,
    /// When false, tool calls terminate the loop without executing.
    pub execute_tools: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            agent: None,
            model_override: None,
            params: CompletionParams::default(),
            max_turns: None,
            execute_tools: true,
        }
    }
}

/// Completion-call machinery shared by the blocking and streaming paths.
///
/// Owns prompt assembly, context condensation, schema stripping, rate
/// limiting, the execution-time budget, fixed-delay retry, and the single
/// content-filter rewrite cycle.
#[derive(Clone)]
pub(crate) struct Completer {
    provider: Arc<dyn CompletionProvider>,
    token_counter: TokenCounter,
    retry: RetryPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
    max_execution_time: Option<Duration>,
    context_window_size: Option<usize>,
    freeze_context_window_size: bool,
}

struct PreparedCall {
    request: CompletionRequest,
    input_tokens: u32,
}

impl Completer {
    async fn prepare(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        turn_context: &ContextVariables,
        options: &RunOptions,
    ) -> PreparedCall {
        let model = options
            .model_override
            .clone()
            .unwrap_or_else(|| agent.model().to_string());

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(agent.instructions(turn_context)));
        messages.extend_from_slice(history);

        if self.freeze_context_window_size {
            if let Some(budget) = self.context_window_size {
                let max_context = budget.min(default_token_limit(&model));
                messages = summarize::condense(
                    self.provider.as_ref(),
                    &model,
                    &messages,
                    max_context,
                    &self.token_counter,
                )
                .await;
            }
        }

        let tools: Vec<ToolDefinition> = agent
            .functions()
            .iter()
            .map(|f| ToolDefinition {
                name: f.name().to_string(),
                description: f.description().to_string(),
                parameters: f.parameters().advertised_schema(),
            })
            .collect();

        let input_tokens = self.token_counter.count_message_tokens(&messages) as u32;

        PreparedCall {
            request: CompletionRequest {
                model,
                messages,
                tools,
                tool_choice: agent.tool_choice(),
                parallel_tool_calls: agent.parallel_tool_calls(),
                params: options.params,
            },
            input_tokens,
        }
    }

    async fn call_once(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        match self.max_execution_time {
            Some(budget) => with_timeout(budget, self.provider.complete(request)).await,
            None => self.provider.complete(request).await,
        }
    }

    async fn open_stream_once(
        &self,
        request: &CompletionRequest,
    ) -> Result<futures::stream::BoxStream<'static, Result<crate::provider::CompletionDelta>>>
    {
        match self.max_execution_time {
            Some(budget) => with_timeout(budget, self.provider.complete_stream(request)).await,
            None => self.provider.complete_stream(request).await,
        }
    }

    /// Swap the system instructions for a moderation-safe rewrite.
    async fn rewrite_request(&self, mut request: CompletionRequest) -> CompletionRequest {
        if let Some(system) = request.messages.first_mut().filter(|m| m.role == Role::System) {
            system.content = summarize::rewrite_instructions(
                self.provider.as_ref(),
                &request.model,
                &system.content,
            )
            .await;
        }
        request
    }

    /// Run one completion under the full recovery policy.
    ///
    /// The rate-limit slot is held for the whole attempt sequence and given
    /// back by the permit guard no matter how the call ends. Content-filter
    /// rejections get exactly one instruction-rewrite retry cycle, then the
    /// error stands.
    async fn complete_prepared(&self, request: CompletionRequest) -> Result<ChatCompletion> {
        let _permit = match &self.rate_limiter {
            Some(limiter) => Some(limiter.acquire().await),
            None => None,
        };

        match self.retry.execute(|| self.call_once(&request)).await {
            Err(e) if e.is_content_filtered() => {
                debug!("content filter hit, retrying with rewritten instructions");
                let request = self.rewrite_request(request).await;
                self.retry.execute(|| self.call_once(&request)).await
            }
            other => other,
        }
    }

    /// Prepare and run one completion for the active agent.
    pub(crate) async fn complete(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        turn_context: &ContextVariables,
        options: &RunOptions,
    ) -> Result<(ChatCompletion, TokenUsage)> {
        let prepared = self.prepare(agent, history, turn_context, options).await;
        let completion = self.complete_prepared(prepared.request).await?;

        let usage = completion.usage.unwrap_or_else(|| {
            // Backend reported nothing; estimate from our own accounting.
            TokenUsage::new(
                prepared.input_tokens,
                self.token_counter.count_tokens(&completion.content) as u32,
            )
        });
        Ok((completion, usage))
    }

    /// Prepare and open one streaming completion for the active agent.
    pub(crate) async fn complete_stream(
        &self,
        agent: &Agent,
        history: &[ChatMessage],
        turn_context: &ContextVariables,
        options: &RunOptions,
    ) -> Result<futures::stream::BoxStream<'static, Result<crate::provider::CompletionDelta>>>
    {
        let prepared = self.prepare(agent, history, turn_context, options).await;
        let request = prepared.request;

        let _permit = match &self.rate_limiter {
            Some(limiter) => Some(limiter.acquire().await),
            None => None,
        };

        match self.retry.execute(|| self.open_stream_once(&request)).await {
            Err(e) if e.is_content_filtered() => {
                debug!("content filter hit, retrying stream with rewritten instructions");
                let request = self.rewrite_request(request).await;
                self.retry.execute(|| self.open_stream_once(&request)).await
            }
            other => other,
        }
    }
}

/// Drives conversations turn by turn: prompt assembly, completion calls,
/// tool dispatch, agent hand-off, and failure containment.
///
/// One manager drives one conversation at a time; run concurrent
/// conversations on separate managers, sharing a [`RateLimiter`] when a
/// global call budget applies.
pub struct AgentManager {
    completer: Completer,
    agent: Agent,
    context_variables: ContextVariables,
    last_token_usage: Option<TokenUsage>,
}

impl AgentManager {
    /// Create a manager driving `agent` against `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>, agent: Agent) -> Self {
        Self {
            completer: Completer {
                provider,
                token_counter: TokenCounter::default(),
                retry: RetryPolicy::default(),
                rate_limiter: None,
                max_execution_time: None,
                context_window_size: None,
                freeze_context_window_size: true,
            },
            agent,
            context_variables: ContextVariables::new(),
            last_token_usage: None,
        }
    }

    /// Caller-level context variables, merged over agent defaults each turn.
    pub fn with_context_variables(mut self, context_variables: ContextVariables) -> Self {
        self.context_variables = context_variables;
        self
    }

    /// Retry policy for transient provider errors.
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.completer.retry = RetryPolicy {
            max_retries,
            retry_delay,
        };
        self
    }

    /// Share a rate limiter across managers.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.completer.rate_limiter = Some(limiter);
        self
    }

    /// Convenience: a private limiter of `rpm` requests per minute.
    pub fn with_rate_limit_rpm(self, rpm: usize) -> Self {
        self.with_rate_limiter(Arc::new(RateLimiter::per_minute(rpm)))
    }

    /// Per-call execution-time budget; exceeding it fails the turn.
    pub fn with_max_execution_time(mut self, budget: Duration) -> Self {
        self.completer.max_execution_time = Some(budget);
        self
    }

    /// Frozen context-window budget in tokens.
    pub fn with_context_window_size(mut self, tokens: usize) -> Self {
        self.completer.context_window_size = Some(tokens);
        self
    }

    /// Enable/disable context freezing (summarization on overflow).
    pub fn with_freeze_context_window(mut self, freeze: bool) -> Self {
        self.completer.freeze_context_window_size = freeze;
        self
    }

    /// Replace the token counter (e.g. with a real tokenizer).
    pub fn with_token_counter(mut self, counter: TokenCounter) -> Self {
        self.completer.token_counter = counter;
        self
    }

    /// The agent new runs start with.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Token usage of the most recently completed request.
    pub fn last_token_usage(&self) -> Option<TokenUsage> {
        self.last_token_usage
    }

    /// Run one user message through the turn loop with default options.
    pub async fn run(&mut self, user_message: &str, memory: &mut Memory) -> RunResponse {
        self.run_with_options(user_message, memory, RunOptions::default())
            .await
    }

    /// Run one user message through the turn loop.
    ///
    /// Never returns an error: terminal failures become an
    /// assistant-authored apology message and the loop ends with whatever
    /// history exists.
    pub async fn run_with_options(
        &mut self,
        user_message: &str,
        memory: &mut Memory,
        options: RunOptions,
    ) -> RunResponse {
        memory.push(ChatMessage::user(user_message));

        let mut active_agent = options.agent.clone().unwrap_or_else(|| self.agent.clone());
        let mut context_variables = self.context_variables.clone();
        let mut produced: Vec<ChatMessage> = Vec::new();
        let max_turns = options.max_turns.unwrap_or(usize::MAX);
        let mut turn = 0usize;

        while turn < max_turns {
            turn += 1;
            let turn_context =
                ContextVariables::merged(active_agent.context_defaults(), &context_variables);

            let mut history = memory.filter_for_agent(&active_agent);
            apply_document_guardrail(&active_agent, &mut history);

            let (completion, usage) = match self
                .completer
                .complete(&active_agent, &history, &turn_context, &options)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    let apology = apology_message(&active_agent, &e);
                    memory.push(apology.clone());
                    produced.push(apology);
                    break;
                }
            };
            self.last_token_usage = Some(usage);
            debug!(agent = %active_agent.name(), turn, "received completion");

            let assistant = ChatMessage::assistant_with_tool_calls(
                completion.content,
                completion.tool_calls.clone(),
            )
            .with_sender(active_agent.name());
            memory.push(assistant.clone());
            produced.push(assistant);

            if completion.tool_calls.is_empty() || !options.execute_tools {
                debug!("ending turn");
                break;
            }

            let partial =
                dispatch::handle_tool_calls(&completion.tool_calls, &active_agent, &turn_context)
                    .await;
            memory.extend(partial.messages.iter().cloned());
            produced.extend(partial.messages);
            context_variables.merge(&partial.context_variables);
            if let Some(next) = partial.agent {
                debug!(from = %active_agent.name(), to = %next.name(), "agent hand-off");
                active_agent = next;
            }
        }

        RunResponse {
            messages: produced,
            agent: active_agent,
            context_variables,
        }
    }
}

/// Prefix the latest user message for document-restricted agents.
fn apply_document_guardrail(agent: &Agent, history: &mut [ChatMessage]) {
    if !agent.external_content() {
        return;
    }
    if let Some(last) = history.last_mut().filter(|m| m.role == Role::User) {
        last.content = format!("{DOCUMENT_GUARDRAIL_PREFIX}{}", last.content);
    }
}

/// The user-visible message a terminal failure turns into.
fn apology_message(agent: &Agent, error: &TychoError) -> ChatMessage {
    let cause = match error.api_code() {
        Some(code) => code.describe().to_string(),
        None => error.to_string(),
    };
    ChatMessage::assistant(format!(
        "I apologize, but I encountered an error while processing your request: {cause}"
    ))
    .with_sender(agent.name())
}
