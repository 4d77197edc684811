//! Prompt production with a no-fail contract.
//!
//! This is the sole boundary generation failures do not cross: retry
//! exhaustion in the backend collapses into a fallback-catalog prompt, so
//! callers never need fallback logic of their own.
use crate::fallback;
use crate::genai::GenerationBackend;
use crate::model::{Language, Prompt, Tier};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct PromptGenerator {
    backend: Arc<dyn GenerationBackend>,
}

impl PromptGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Produce a prompt for the pair. Always returns a usable prompt.
    pub async fn produce(&self, tier: Tier, language: Language) -> Prompt {
        match self.generate(tier, language).await {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(?err, %tier, %language, "generation failed; using fallback prompt");
                fallback::get(tier, language)
            }
        }
    }

    async fn generate(&self, tier: Tier, language: Language) -> anyhow::Result<Prompt> {
        let generated = self.backend.generate_text(tier, language).await?;
        let image_url = self
            .backend
            .generate_image(&generated.text, tier, language)
            .await?;
        Ok(Prompt {
            text: generated.text,
            image_url,
            tier,
            language,
        })
    }
}
