//! Opaque content generators for the unrelated generation task.
//!
//! Text and image generation are external collaborators (prompt in, content
//! out). Their failures never fail a job: text degrades to a fixed fallback
//! string and the image degrades to the placeholder URL.

use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::blob::BlobStore;

/// Fallback text when generation fails.
pub const FALLBACK_TEXT: &str = "An error occurred while generating the requested text.";

/// Opaque text generator: prompt -> text.
pub trait TextGenerator: Send + Sync {
    fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Opaque image generator: prompt -> image bytes.
pub trait ImageGenerator: Send + Sync {
    fn generate_image(&self, prompt: &str) -> anyhow::Result<Vec<u8>>;
}

/// Trivial local generator used by the CLI and tests.
///
/// Echoes the prompt into deterministic content instead of calling a model.
pub struct EchoGenerator;

impl TextGenerator for EchoGenerator {
    fn generate_text(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(format!("[generated] {}", prompt))
    }
}

impl ImageGenerator for EchoGenerator {
    fn generate_image(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        Ok(prompt.as_bytes().to_vec())
    }
}

/// Result of a generation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub text: String,
    pub image_url: String,
}

/// Run a generation task with degraded fallbacks.
///
/// Generator or store failures degrade the respective field; the task itself
/// always produces an outcome.
pub fn run_generation(
    text_generator: &dyn TextGenerator,
    image_generator: &dyn ImageGenerator,
    store: &dyn BlobStore,
    text_prompt: &str,
    image_prompt: &str,
    placeholder_url: &str,
) -> GenerationOutcome {
    let text = match text_generator.generate_text(text_prompt) {
        Ok(text) => text,
        Err(e) => {
            error!("Text generation failed: {}", e);
            FALLBACK_TEXT.to_string()
        }
    };

    let image_url = match image_generator.generate_image(image_prompt) {
        Ok(bytes) => {
            let name = format!("{}.png", Uuid::new_v4());
            match store.put(&bytes, &name) {
                Ok(url) => url,
                Err(e) => {
                    error!("Failed to store generated image: {}", e);
                    placeholder_url.to_string()
                }
            }
        }
        Err(e) => {
            error!("Image generation failed: {}", e);
            placeholder_url.to_string()
        }
    };

    GenerationOutcome { text, image_url }
}
