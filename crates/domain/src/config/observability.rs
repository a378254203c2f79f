use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Logging & observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls the `tracing` subscriber a binary built on this workspace
/// would install. The library crates only ever call
/// `tracing::{info,warn,debug,error}!` — this config exists so a host
/// binary's `tracing-subscriber` setup is driven consistently rather
/// than each entry point hand-rolling its own filter/format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"orchestrator=debug,warn"`.
    #[serde(default = "d_log_filter")]
    pub log_filter: String,

    /// Emit single-line JSON log records instead of human-readable text.
    #[serde(default = "d_json")]
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: d_log_filter(),
            json: d_json(),
        }
    }
}

fn d_log_filter() -> String {
    "info".into()
}

fn d_json() -> bool {
    true
}
