use serde::{Deserialize, Serialize};

/// Capability descriptor for a provider instance. The registry and the
/// orchestrator facade consult this to validate inputs *before* a call is
/// attempted and to discover providers by capability (see
/// `ProviderRegistry::discover_providers`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCapabilities {
    pub supports_vision: bool,
    pub supports_streaming: bool,
    /// Maximum accepted image size in bytes, or `None` if images aren't
    /// accepted at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<u64>,
    /// Image formats this provider will accept. Empty when `supports_vision`
    /// is false.
    #[serde(default)]
    pub allowed_image_formats: Vec<ImageFormat>,
    /// Maximum prompt length in characters, or `None` for no declared limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_prompt_chars: Option<usize>,
    /// Accepted `maxTokens` range for a single call.
    pub min_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Maximum number of images accepted in a single call.
    pub max_images_per_call: u32,
}

impl Default for LlmCapabilities {
    fn default() -> Self {
        Self {
            supports_vision: false,
            supports_streaming: false,
            max_image_bytes: None,
            allowed_image_formats: Vec::new(),
            max_prompt_chars: None,
            min_output_tokens: 1,
            max_output_tokens: None,
            max_images_per_call: 1,
        }
    }
}

impl LlmCapabilities {
    /// Whether `output_tokens` falls within the accepted range.
    pub fn accepts_output_tokens(&self, tokens: u32) -> bool {
        if tokens < self.min_output_tokens {
            return false;
        }
        match self.max_output_tokens {
            Some(max) => tokens <= max,
            None => true,
        }
    }

    pub fn accepts_image_format(&self, format: ImageFormat) -> bool {
        self.allowed_image_formats.contains(&format)
    }
}

/// Image media types sniffed from the first bytes of a blob (see
/// `sniff_image_format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Detects an image's media type from its magic bytes. Unknown signatures
/// default to jpeg, matching the source's permissive fallback behavior.
pub fn sniff_image_format(bytes: &[u8]) -> ImageFormat {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return ImageFormat::Jpeg;
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return ImageFormat::Png;
    }
    if bytes.starts_with(b"GIF") {
        return ImageFormat::Gif;
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return ImageFormat::Webp;
    }
    ImageFormat::Jpeg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_jpeg() {
        assert_eq!(sniff_image_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
    }

    #[test]
    fn sniffs_png() {
        assert_eq!(
            sniff_image_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            ImageFormat::Png
        );
    }

    #[test]
    fn sniffs_gif() {
        assert_eq!(sniff_image_format(b"GIF89a"), ImageFormat::Gif);
    }

    #[test]
    fn sniffs_webp() {
        let mut bytes = b"RIFF".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(b"WEBP");
        assert_eq!(sniff_image_format(&bytes), ImageFormat::Webp);
    }

    #[test]
    fn unknown_defaults_to_jpeg() {
        assert_eq!(sniff_image_format(&[0x00, 0x01, 0x02]), ImageFormat::Jpeg);
    }

    #[test]
    fn accepts_output_tokens_range() {
        let cap = LlmCapabilities {
            min_output_tokens: 1,
            max_output_tokens: Some(8192),
            ..LlmCapabilities::default()
        };
        assert!(cap.accepts_output_tokens(1));
        assert!(cap.accepts_output_tokens(8192));
        assert!(!cap.accepts_output_tokens(0));
        assert!(!cap.accepts_output_tokens(8193));
    }
}
