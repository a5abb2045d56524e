use async_trait::async_trait;

use crate::error::Result;

/// Single-turn text generation against an external model service.
///
/// Implementations report failures as errors; choosing replacement text is
/// left to the caller.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
