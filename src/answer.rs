use std::sync::Arc;

use crate::error::RagError;
use crate::llm::LanguageModel;
use crate::prompt::{build_prompt, join_context};

/// Turns retrieved context plus a question into a model-written answer.
pub struct AnswerComposer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerComposer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Build the prompt, call the model once, and return its output as-is.
    pub async fn answer<S: AsRef<str> + Sync>(
        &self,
        question: &str,
        context_chunks: &[S],
    ) -> Result<String, RagError> {
        let prompt = build_prompt(&join_context(context_chunks), question);
        self.model.generate(&prompt).await.map_err(|e| {
            tracing::warn!(model = self.model.model_name(), error = %e, "generation failed");
            RagError::Generation(e.to_string())
        })
    }
}
