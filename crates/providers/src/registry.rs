//! Provider registry & factory.
//!
//! Two maps: registered provider kinds and active instances. `register`
//! refuses re-registering a kind; `create_providers` builds every enabled
//! config entry in descending-priority order and fails hard only if none
//! of them come up.

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use sa_domain::config::{LlmConfig, LlmStartupPolicy, ProviderConfig, ProviderKind};
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Records a provider that failed to initialize.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub kind: String,
    /// Error message with any potential secrets masked.
    pub error: String,
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message before it reaches logs or readiness endpoints.
fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

fn build_one(
    pc: &ProviderConfig,
    llm_config: &LlmConfig,
) -> Result<Arc<dyn LlmProvider>> {
    let pricing = llm_config.pricing.clone();
    let timeout_ms = llm_config.default_timeout_ms;
    match pc.kind {
        ProviderKind::Anthropic => AnthropicProvider::from_config(
            pc,
            Default::default(),
            Default::default(),
            pricing,
            timeout_ms,
        )
        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
        ProviderKind::OpenaiCompat => OpenAiCompatProvider::from_config(
            pc,
            Default::default(),
            Default::default(),
            pricing,
            timeout_ms,
        )
        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
    }
}

/// Holds registered provider kinds and the instances built from them.
pub struct ProviderRegistry {
    registered_kinds: HashSet<ProviderKind>,
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    fallback_chains: HashMap<String, Vec<String>>,
    init_errors: Vec<ProviderInitError>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            registered_kinds: HashSet::new(),
            providers: HashMap::new(),
            fallback_chains: HashMap::new(),
            init_errors: Vec::new(),
        }
    }

    /// Register a provider kind as constructible. Refuses re-registration.
    pub fn register(&mut self, kind: ProviderKind) -> Result<()> {
        if !self.registered_kinds.insert(kind) {
            return Err(Error::Configuration(format!(
                "provider kind {kind:?} is already registered"
            )));
        }
        Ok(())
    }

    /// Build a single provider instance from its config.
    pub fn create_provider(
        &mut self,
        pc: &ProviderConfig,
        llm_config: &LlmConfig,
    ) -> Result<()> {
        if !self.registered_kinds.contains(&pc.kind) {
            return Err(Error::Configuration(format!(
                "provider kind {:?} was never registered",
                pc.kind
            )));
        }
        let provider = build_one(pc, llm_config)?;
        self.providers.insert(pc.id.clone(), provider);
        self.fallback_chains
            .insert(pc.id.clone(), pc.fallback_providers.clone());
        Ok(())
    }

    /// Build the registry from the application's [`LlmConfig`]: every
    /// `ProviderKind` used by a configured provider is auto-registered, then
    /// enabled providers are constructed in descending-priority order.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut registry = Self::new();
        for kind in [ProviderKind::Anthropic, ProviderKind::OpenaiCompat] {
            let _ = registry.register(kind);
        }

        let mut enabled: Vec<&ProviderConfig> =
            config.providers.iter().filter(|p| p.enabled).collect();
        enabled.sort_by(|a, b| b.priority.cmp(&a.priority));

        for pc in &enabled {
            match build_one(pc, config) {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    TraceEvent::ProviderRegistered {
                        provider_id: pc.id.clone(),
                        provider_type: format!("{:?}", pc.kind),
                    }
                    .emit();
                    registry.providers.insert(pc.id.clone(), provider);
                    registry
                        .fallback_chains
                        .insert(pc.id.clone(), pc.fallback_providers.clone());
                }
                Err(e) => {
                    let safe_error = mask_secrets(&e.to_string());
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %safe_error,
                        "failed to initialize LLM provider, skipping"
                    );
                    TraceEvent::ProviderInitFailed {
                        provider_type: format!("{:?}", pc.kind),
                        reason: safe_error.clone(),
                    }
                    .emit();
                    registry.init_errors.push(ProviderInitError {
                        provider_id: pc.id.clone(),
                        kind: format!("{:?}", pc.kind),
                        error: safe_error,
                    });
                }
            }
        }

        if registry.providers.is_empty() && !enabled.is_empty() {
            match config.startup_policy {
                LlmStartupPolicy::RequireOne => {
                    return Err(Error::Configuration(
                        "all configured LLM providers failed to initialize \
                         (startup_policy = require_one)"
                            .into(),
                    ));
                }
                LlmStartupPolicy::AllowNone => {
                    tracing::warn!(
                        failed_providers = registry.init_errors.len(),
                        "no LLM providers initialized (startup_policy = allow_none); \
                         analysis calls will fail until auth is configured"
                    );
                }
            }
        }

        Ok(registry)
    }

    /// Register an already-built provider instance directly, bypassing
    /// `create_provider`'s config-driven construction. Useful for wiring in
    /// a custom or test adapter under its own id.
    pub fn insert(&mut self, id: impl Into<String>, provider: Arc<dyn LlmProvider>, fallback_providers: Vec<String>) {
        let id = id.into();
        self.providers.insert(id.clone(), provider);
        self.fallback_chains.insert(id, fallback_providers);
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// The fallback chain configured for `provider_id`, with unknown or
    /// never-successfully-built provider ids silently dropped.
    pub fn fallback_chain(&self, provider_id: &str) -> Vec<Arc<dyn LlmProvider>> {
        self.fallback_chains
            .get(provider_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.providers.get(id).cloned())
            .collect()
    }

    /// Registered kinds (plus their priority-ordered enabled configs, built
    /// in [`Self::from_config`]) whose capability descriptor satisfies
    /// `predicate`, highest priority first.
    pub fn discover(&self, predicate: impl Fn(&sa_domain::capability::LlmCapabilities) -> bool) -> Vec<String> {
        let mut ids: Vec<String> = self
            .providers
            .iter()
            .filter(|(_, p)| predicate(p.capabilities()))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn LlmProvider>)> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Provider initialization errors (empty if all succeeded).
    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_domain::config::{AuthConfig, AuthMode};

    fn provider_cfg(id: &str, priority: i32, fallbacks: Vec<&str>) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            kind: ProviderKind::Anthropic,
            base_url: "https://api.anthropic.com".into(),
            enabled: true,
            priority,
            auth: AuthConfig {
                mode: AuthMode::ApiKey,
                key: Some("test-key".into()),
                ..Default::default()
            },
            default_model: None,
            fallback_providers: fallbacks.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn register_refuses_duplicate() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderKind::Anthropic).unwrap();
        let err = registry.register(ProviderKind::Anthropic).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn create_provider_requires_registered_kind() {
        let mut registry = ProviderRegistry::new();
        let cfg = provider_cfg("claude", 10, vec![]);
        let err = registry
            .create_provider(&cfg, &LlmConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn from_config_builds_in_priority_order_and_wires_fallback() {
        let config = LlmConfig {
            providers: vec![
                provider_cfg("low", 1, vec![]),
                provider_cfg("high", 10, vec!["low".into(), "ghost".into()]),
            ],
            ..LlmConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 2);
        let chain = registry.fallback_chain("high");
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].provider_id(), "low");
    }

    #[test]
    fn no_providers_configured_is_not_an_error() {
        let registry = ProviderRegistry::from_config(&LlmConfig::default()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn discover_filters_by_capability() {
        let config = LlmConfig {
            providers: vec![provider_cfg("claude", 1, vec![])],
            ..LlmConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        let vision_providers = registry.discover(|c| c.supports_vision);
        assert_eq!(vision_providers, vec!["claude".to_string()]);
        let none = registry.discover(|_| false);
        assert!(none.is_empty());
    }
}
