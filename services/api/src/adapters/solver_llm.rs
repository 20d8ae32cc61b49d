//! services/api/src/adapters/solver_llm.rs
//!
//! This module contains the adapter for the doubt-solving LLM.
//! It implements the `DoubtSolverService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use study_hub_core::{
    domain::{DoubtSolverInput, DoubtSolverOutput},
    ports::{DoubtSolverService, PortError, PortResult},
};

const SYSTEM_INSTRUCTIONS: &str = "You are a study assistant for university students. \
Given a student's doubt and the subject material it relates to, suggest concrete steps \
the student can take to resolve it: concepts to revisit, a worked hint, or where in the \
material to look. Do not just state a final answer.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DoubtSolverService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSolverAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSolverAdapter {
    /// Creates a new `OpenAiSolverAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `DoubtSolverService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DoubtSolverService for OpenAiSolverAdapter {
    async fn suggest(&self, input: &DoubtSolverInput) -> PortResult<DoubtSolverOutput> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Backend(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Doubt: {}\n\nSubject Material: {}",
                    input.doubt_text, input.subject_material
                ))
                .build()
                .map_err(|e| PortError::Backend(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Backend(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Backend(e.to_string()))?;

        let suggestions = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Backend("Doubt solver LLM response contained no text content.".to_string())
            })?;

        Ok(DoubtSolverOutput {
            suggestions: suggestions.trim().to_string(),
        })
    }
}
