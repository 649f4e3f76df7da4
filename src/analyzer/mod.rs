//! AI health analysis of products and product lists.

pub mod advisor;
pub mod gemini;
pub mod image_prep;
pub mod prompts;
pub mod types;
pub mod validation;

pub use advisor::{recommendation_signals, Advisor, AdvisorError};
pub use gemini::{BackendError, GeminiClient, GenerateRequest, GenerativeBackend, Part};
pub use image_prep::{prepare_image, prepare_image_file, ImageError, PreparedImage};
pub use types::*;
