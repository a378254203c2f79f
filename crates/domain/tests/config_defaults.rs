use sa_domain::config::Config;

#[test]
fn default_config_has_no_providers() {
    let config = Config::default();
    assert!(config.llm.providers.is_empty());
}

#[test]
fn toml_overrides_nested_values() {
    let toml_str = r#"
[circuit_breaker]
failure_threshold = 10

[rate_limiter]
requests_per_minute = 30
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.circuit_breaker.failure_threshold, 10);
    assert_eq!(config.rate_limiter.requests_per_minute, 30);
    // Untouched sections keep their defaults.
    assert_eq!(config.context_store.expiration_hours, 24);
}

#[test]
fn toml_round_trips_a_provider_entry() {
    let toml_str = r#"
[[llm.providers]]
id = "claude"
kind = "anthropic"
base_url = "https://api.anthropic.com"
enabled = true
priority = 10

[llm.providers.auth]
env = "ANTHROPIC_API_KEY"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.providers.len(), 1);
    assert_eq!(config.llm.providers[0].id, "claude");
}
