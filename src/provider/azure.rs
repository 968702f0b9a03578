//! Azure OpenAI Service adapter.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::debug;

use crate::config::TychoConfig;
use crate::error::{Result, TychoError};

use super::http::api_key_headers;
use super::openai::{build_request_body, execute, execute_stream};
use super::{ChatCompletion, CompletionDelta, CompletionProvider, CompletionRequest};

const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Azure-hosted OpenAI-compatible provider.
///
/// Same request/response shapes as OpenAI, but the call targets a
/// deployment-scoped URL with an `api-version` query parameter and
/// authenticates with an `api-key` header.
pub struct AzureOpenAiProvider {
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl AzureOpenAiProvider {
    /// `endpoint`: e.g. "https://myresource.openai.azure.com";
    /// `deployment`: the deployed model name.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: api_version.into(),
        }
    }

    /// Construct from an explicit config (reads the `azure` entries).
    pub fn from_config(config: &TychoConfig, deployment: impl Into<String>) -> Result<Self> {
        let api_key = config
            .get_api_key("azure")
            .ok_or_else(|| TychoError::Authentication("Missing AZURE_OPENAI_API_KEY".into()))?;
        let endpoint = config
            .get_base_url("azure")
            .ok_or_else(|| TychoError::Configuration("Missing AZURE_OPENAI_ENDPOINT".into()))?;
        Ok(Self::new(
            api_key,
            endpoint,
            deployment,
            DEFAULT_API_VERSION,
        ))
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version,
        )
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        let body = build_request_body(request, false);
        debug!(deployment = %self.deployment, "azure completion");
        execute(&self.completions_url(), api_key_headers(&self.api_key), &body).await
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<CompletionDelta>>> {
        let body = build_request_body(request, true);
        debug!(deployment = %self.deployment, "azure streaming completion");
        execute_stream(&self.completions_url(), api_key_headers(&self.api_key), &body).await
    }
}
