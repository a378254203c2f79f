mod circuit_breaker;
mod context_store;
mod detection_pipeline;
mod detection_queue;
mod follow_up;
mod llm;
mod monitor;
mod observability;
mod query_enhancer;
mod summarizer;

pub use circuit_breaker::*;
pub use context_store::*;
pub use detection_pipeline::*;
pub use detection_queue::*;
pub use follow_up::*;
pub use llm::*;
pub use monitor::*;
pub use observability::*;
pub use query_enhancer::*;
pub use summarizer::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    #[serde(default)]
    pub context_store: ContextStoreConfig,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
    #[serde(default)]
    pub query_enhancer: QueryEnhancerConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub detection_queue: DetectionQueueConfig,
    #[serde(default)]
    pub detection_pipeline: DetectionPipelineConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if !provider.base_url.is_empty()
                && !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.providers[{i}].id"),
                    message: format!(
                        "duplicate provider id \"{}\" — later provider will shadow earlier one",
                        provider.id
                    ),
                });
            }

            let needs_credentials = matches!(provider.auth.mode, AuthMode::ApiKey);
            if needs_credentials {
                let has_env = provider.auth.env.as_ref().is_some_and(|v| !v.is_empty());
                let has_key = provider.auth.key.as_ref().is_some_and(|v| !v.is_empty());
                let has_keychain =
                    provider.auth.service.is_some() && provider.auth.account.is_some();
                if !has_env && !has_key && !has_keychain {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("llm.providers[{i}].auth"),
                        message: format!(
                            "provider \"{}\" uses api_key auth mode but has no auth.env, auth.key, or auth.service/account configured",
                            provider.id
                        ),
                    });
                }
            }

            for fallback_id in &provider.fallback_providers {
                if fallback_id == &provider.id {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("llm.providers[{i}].fallback_providers"),
                        message: format!("provider \"{}\" lists itself as a fallback", provider.id),
                    });
                }
            }
        }

        if self.circuit_breaker.failure_threshold == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "circuit_breaker.failure_threshold".into(),
                message: "failure_threshold must be greater than 0".into(),
            });
        }

        if self.rate_limiter.requests_per_minute == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "rate_limiter.requests_per_minute".into(),
                message: "requests_per_minute must be greater than 0".into(),
            });
        }

        if self.summarizer.preserve_recent_turns == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "summarizer.preserve_recent_turns".into(),
                message: "preserving zero turns discards all verbatim history".into(),
            });
        }

        if self.summarizer.preserve_recent_turns >= self.summarizer.max_turns_before_summarization
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "summarizer.preserve_recent_turns".into(),
                message: "preserve_recent_turns must be less than max_turns_before_summarization"
                    .into(),
            });
        }

        if self.detection_pipeline.min_aspect_ratio >= self.detection_pipeline.max_aspect_ratio {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "detection_pipeline.min_aspect_ratio".into(),
                message: "min_aspect_ratio must be less than max_aspect_ratio".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.monitor.ema_alpha) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "monitor.ema_alpha".into(),
                message: "ema_alpha must be within [0, 1]".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            llm: LlmConfig {
                providers: vec![ProviderConfig {
                    id: "claude".into(),
                    kind: ProviderKind::Anthropic,
                    base_url: "https://api.anthropic.com".into(),
                    enabled: true,
                    priority: 10,
                    auth: AuthConfig {
                        mode: AuthMode::ApiKey,
                        env: Some("ANTHROPIC_API_KEY".into()),
                        ..AuthConfig::default()
                    },
                    default_model: None,
                    fallback_providers: vec![],
                }],
                ..LlmConfig::default()
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues
            .iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn no_providers_is_warning() {
        let mut cfg = valid_config();
        cfg.llm.providers.clear();
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers").expect("expected warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn provider_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers[0].base_url = "ws://localhost".into();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.providers[0].base_url").is_some());
    }

    #[test]
    fn provider_api_key_mode_no_credentials_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers[0].auth = AuthConfig {
            mode: AuthMode::ApiKey,
            env: None,
            key: None,
            ..AuthConfig::default()
        };
        let issues = cfg.validate();
        let issue = find_issue(&issues, "llm.providers[0].auth").expect("expected error");
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn self_referential_fallback_is_error() {
        let mut cfg = valid_config();
        cfg.llm.providers[0].fallback_providers = vec!["claude".into()];
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.providers[0].fallback_providers").is_some());
    }

    #[test]
    fn zero_failure_threshold_is_error() {
        let mut cfg = valid_config();
        cfg.circuit_breaker.failure_threshold = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "circuit_breaker.failure_threshold").is_some());
    }

    #[test]
    fn preserve_recent_turns_must_be_less_than_max() {
        let mut cfg = valid_config();
        cfg.summarizer.preserve_recent_turns = 30;
        cfg.summarizer.max_turns_before_summarization = 30;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "summarizer.preserve_recent_turns").is_some());
    }

    #[test]
    fn invalid_aspect_ratio_bounds_is_error() {
        let mut cfg = valid_config();
        cfg.detection_pipeline.min_aspect_ratio = 5.0;
        cfg.detection_pipeline.max_aspect_ratio = 1.0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "detection_pipeline.min_aspect_ratio").is_some());
    }

    #[test]
    fn ema_alpha_out_of_range_is_error() {
        let mut cfg = valid_config();
        cfg.monitor.ema_alpha = 1.5;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "monitor.ema_alpha").is_some());
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "circuit_breaker.failure_threshold".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(
            format!("{err}"),
            "[ERROR] circuit_breaker.failure_threshold: must be greater than 0"
        );
    }
}
