//! Configuration: API keys and endpoints, explicit or environment-derived.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Provider configuration for Tycho.
///
/// Keys resolve from explicit `set_api_key` calls first, then from the
/// environment snapshot taken by [`TychoConfig::from_env`]. There is no
/// implicit global default — every provider is constructed with a config
/// passed in by the caller.
#[derive(Debug, Clone, Default)]
pub struct TychoConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
}

impl TychoConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`{PROVIDER}_API_KEY` convention).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let config = Self::new();

        let env_mappings = [
            ("OPENAI_API_KEY", "openai"),
            ("AZURE_OPENAI_API_KEY", "azure"),
            ("GROQ_API_KEY", "groq"),
        ];

        for (env_var, provider) in &env_mappings {
            if let Ok(key) = std::env::var(env_var) {
                config.set_api_key(provider, key);
            }
        }

        let url_mappings = [
            ("OPENAI_BASE_URL", "openai"),
            ("AZURE_OPENAI_ENDPOINT", "azure"),
            ("GROQ_BASE_URL", "groq"),
        ];

        for (env_var, provider) in &url_mappings {
            if let Ok(url) = std::env::var(env_var) {
                config.set_base_url(provider, url);
            }
        }

        config
    }

    /// Set an API key for a provider.
    pub fn set_api_key(&self, provider: &str, key: impl Into<String>) {
        if let Ok(mut keys) = self.api_keys.write() {
            keys.insert(provider.to_string(), key.into());
        }
    }

    /// Get the API key for a provider.
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.read().ok()?.get(provider).cloned()
    }

    /// Set a base URL (or Azure endpoint) for a provider.
    pub fn set_base_url(&self, provider: &str, url: impl Into<String>) {
        if let Ok(mut urls) = self.base_urls.write() {
            urls.insert(provider.to_string(), url.into());
        }
    }

    /// Get the base URL override for a provider.
    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.read().ok()?.get(provider).cloned()
    }
}
