pub mod capability;
pub mod config;
pub mod error;
pub mod trace;
pub mod usage;

pub use capability::{sniff_image_format, ImageFormat, LlmCapabilities};
pub use error::{Error, Result};
pub use trace::TraceEvent;
pub use usage::Usage;
