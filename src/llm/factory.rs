use std::sync::Arc;

use crate::error::AppError;
use crate::llm::openai_compatible::OpenAICompatibleProvider;
use crate::llm::provider::LLMProvider;
use crate::models::llm::LLMRuntimeConfig;

pub fn provider_from_runtime_config(cfg: &LLMRuntimeConfig) -> Result<Arc<dyn LLMProvider>, AppError> {
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAICompatibleProvider::from_config(cfg)?);
    tracing::debug!(
        provider = provider.provider_name(),
        model = provider.model_id(),
        "completion gateway ready"
    );
    Ok(provider)
}
