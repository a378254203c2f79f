use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider configuration (ingest shape)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_30000u")]
    pub default_timeout_ms: u64,
    /// If true, abort startup when no providers initialize.
    #[serde(default)]
    pub startup_policy: LlmStartupPolicy,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Per-model pricing for cost estimation (key = model name).
    #[serde(default)]
    pub pricing: std::collections::HashMap<String, ModelPricing>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: d_30000u(),
            startup_policy: LlmStartupPolicy::AllowNone,
            providers: Vec::new(),
            pricing: std::collections::HashMap::new(),
        }
    }
}

/// Controls how the facade handles provider initialization at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmStartupPolicy {
    /// Boots even if no providers initialize; calls fail until configured.
    #[default]
    AllowNone,
    /// Abort startup if no providers successfully initialize.
    RequireOne,
}

/// Pricing per million tokens for a specific model, used by
/// `Provider::get_cost`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl ModelPricing {
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_1m + output_tokens as f64 * self.output_per_1m)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub enabled: bool,
    /// Higher priority is preferred when building the ensemble.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
    /// Ordered fallback provider ids tried when this one fails.
    #[serde(default)]
    pub fallback_providers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenaiCompat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
    /// Keychain service/account pair, resolved via the OS credential store.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ApiKey,
    Keychain,
    None,
}

fn d_30000u() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_pricing_estimate_cost() {
        let pricing = ModelPricing {
            input_per_1m: 2.50,
            output_per_1m: 10.00,
        };
        let cost = pricing.estimate_cost(1000, 500);
        assert!((cost - 0.0075).abs() < 1e-10);
    }

    #[test]
    fn model_pricing_zero_tokens() {
        let pricing = ModelPricing {
            input_per_1m: 5.00,
            output_per_1m: 15.00,
        };
        assert!((pricing.estimate_cost(0, 0) - 0.0).abs() < 1e-10);
    }

    #[test]
    fn model_pricing_claude_70_30_mix() {
        // Claude's documented pricing split: 70% of tokens counted as
        // input, 30% as output, at vendor-specific per-1K rates.
        let pricing = ModelPricing {
            input_per_1m: 3.00,
            output_per_1m: 15.00,
        };
        let total_tokens = 1000u32;
        let input = (total_tokens as f64 * 0.7) as u32;
        let output = (total_tokens as f64 * 0.3) as u32;
        let cost = pricing.estimate_cost(input, output);
        assert!(cost > 0.0);
    }

    #[test]
    fn llm_config_default_has_empty_pricing() {
        let config = LlmConfig::default();
        assert!(config.pricing.is_empty());
        assert_eq!(config.default_timeout_ms, 30_000);
    }

    #[test]
    fn provider_config_deserializes_with_defaults() {
        let json = r#"{
            "id": "claude",
            "kind": "anthropic",
            "base_url": "https://api.anthropic.com",
            "enabled": true,
            "priority": 10,
            "auth": { "env": "ANTHROPIC_API_KEY" },
            "fallback_providers": ["openai"]
        }"#;
        let cfg: ProviderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.kind, ProviderKind::Anthropic);
        assert_eq!(cfg.fallback_providers, vec!["openai".to_string()]);
        assert_eq!(cfg.auth.mode, AuthMode::ApiKey);
    }
}
