//! Provider identity and the registry of configured providers

use super::{LlmProvider, OllamaClient, OpenAiClient};
use crate::config::Config;
use crate::error::{Result, RouteError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Ollama, ProviderKind::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = RouteError;

    /// Accepts any casing plus the `LLMProvider.X` enum spelling
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let name = lowered.strip_prefix("llmprovider.").unwrap_or(&lowered);
        match name {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" | "open_ai" | "open-ai" => Ok(ProviderKind::OpenAi),
            _ => Err(RouteError::InvalidInput(format!(
                "Unknown provider '{}' (expected one of: ollama, openai)",
                s.trim()
            ))),
        }
    }
}

/// Configured providers, looked up by kind
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every provider that has enough configuration.
    /// OpenAI is skipped when no API key is available.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();

        let ollama = OllamaClient::new(config.providers.ollama.clone())?;
        registry.register(Arc::new(ollama));

        if config.providers.openai.api_key.is_some() {
            let openai = OpenAiClient::new(config.providers.openai.clone())?;
            registry.register(Arc::new(openai));
        } else {
            tracing::debug!("OpenAI provider not registered: no API key");
        }

        Ok(registry)
    }

    /// Register (or replace) the provider for its kind
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn resolve(&self, kind: ProviderKind) -> Result<Arc<dyn LlmProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(RouteError::ProviderNotConfigured(kind))
    }

    /// Kinds that resolve successfully, in declaration order
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k))
            .collect()
    }
}
