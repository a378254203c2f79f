use serde::{Deserialize, Serialize};

/// Token usage for a single provider call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Estimate usage from content length when a provider doesn't report
    /// token counts: `ceil(length / 4)`, the fallback the response
    /// normalizer uses for the `content` field.
    pub fn estimate_from_len(prompt_chars: usize, completion_chars: usize) -> Self {
        let prompt_tokens = prompt_chars.div_ceil(4) as u32;
        let completion_tokens = completion_chars.div_ceil(4) as u32;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        let u = Usage::estimate_from_len(5, 3);
        assert_eq!(u.prompt_tokens, 2);
        assert_eq!(u.completion_tokens, 1);
        assert_eq!(u.total_tokens, 3);
    }
}
