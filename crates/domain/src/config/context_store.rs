use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation context store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextStoreConfig {
    /// Turns a context may hold before the caller must summarize first.
    #[serde(default = "d_max_turns_per_context")]
    pub max_turns_per_context: usize,
    /// Hours of inactivity-independent lifetime before `expiresAt`.
    #[serde(default = "d_expiration_hours")]
    pub expiration_hours: u64,
    /// LRU idle cutoff for `cleanupByIdle`.
    #[serde(default = "d_max_idle_ms")]
    pub max_idle_ms: u64,
}

impl Default for ContextStoreConfig {
    fn default() -> Self {
        Self {
            max_turns_per_context: d_max_turns_per_context(),
            expiration_hours: d_expiration_hours(),
            max_idle_ms: d_max_idle_ms(),
        }
    }
}

fn d_max_turns_per_context() -> usize {
    200
}
fn d_expiration_hours() -> u64 {
    24
}
fn d_max_idle_ms() -> u64 {
    3_600_000
}
