use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use practice_core::banding::Difficulty;
use practice_core::model::{Topic, TopicId};

use crate::error::GeneratorError;

//
// ─── QUESTION CONTENT ──────────────────────────────────────────────────────────
//

/// Where a question's body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    Template,
    Ai,
}

/// A question ready to present to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionContent {
    pub topic_id: TopicId,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub answer: Option<String>,
    pub source: QuestionSource,
}

/// Produces question content for a topic at a difficulty.
///
/// The call is best effort by contract: implementations always return
/// usable content or a deterministic placeholder, never an error. The
/// orchestrator relies on this and does not carry a failure path for it.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, topic: &Topic, difficulty: Difficulty) -> QuestionContent;
}

//
// ─── TEMPLATE GENERATOR ────────────────────────────────────────────────────────
//

/// Deterministic template-based generator; also the fallback for the AI
/// path.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// Builds the placeholder question for a topic at a difficulty.
    #[must_use]
    pub fn build(topic: &Topic, difficulty: Difficulty) -> QuestionContent {
        let prompt = match difficulty {
            Difficulty::Beginner => format!(
                "Write a function that solves a basic {} problem. \
                 Start from the happy path; ignore edge cases for now.",
                topic.name()
            ),
            Difficulty::Intermediate => format!(
                "Solve a {} problem that includes edge cases: empty input, \
                 duplicates, and boundary values. State the complexity of your approach.",
                topic.name()
            ),
            Difficulty::Advanced => format!(
                "Solve an optimized {} problem. Aim for the best known time \
                 complexity and justify the trade-offs you make.",
                topic.name()
            ),
        };

        QuestionContent {
            topic_id: topic.id(),
            difficulty,
            prompt,
            answer: None,
            source: QuestionSource::Template,
        }
    }
}

#[async_trait]
impl QuestionGenerator for TemplateGenerator {
    async fn generate(&self, topic: &Topic, difficulty: Difficulty) -> QuestionContent {
        Self::build(topic, difficulty)
    }
}

//
// ─── AI GENERATOR ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct AiGeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AiGeneratorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PRACTICE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("PRACTICE_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("PRACTICE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Calls an OpenAI-compatible chat-completions endpoint for question
/// bodies, falling back to [`TemplateGenerator`] on any failure so callers
/// always get a usable question.
#[derive(Clone)]
pub struct AiQuestionGenerator {
    client: Client,
    config: Option<AiGeneratorConfig>,
}

impl AiQuestionGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiGeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<AiGeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn request_question(
        &self,
        config: &AiGeneratorConfig,
        topic: &Topic,
        difficulty: Difficulty,
    ) -> Result<QuestionContent, GeneratorError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let prompt = format!(
            "Generate one {difficulty} practice question about {}. \
             Reply with JSON only: {{\"prompt\": \"...\", \"answer\": \"...\"}}.",
            topic.name()
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeneratorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GeneratorError::EmptyResponse)?;

        // Models occasionally ignore the JSON instruction; the raw text is
        // still a usable prompt in that case.
        let (prompt, answer) = match serde_json::from_str::<QuestionPayload>(&content) {
            Ok(parsed) if !parsed.prompt.trim().is_empty() => (parsed.prompt, parsed.answer),
            _ => (content, None),
        };

        Ok(QuestionContent {
            topic_id: topic.id(),
            difficulty,
            prompt,
            answer,
            source: QuestionSource::Ai,
        })
    }
}

#[async_trait]
impl QuestionGenerator for AiQuestionGenerator {
    async fn generate(&self, topic: &Topic, difficulty: Difficulty) -> QuestionContent {
        let Some(config) = &self.config else {
            return TemplateGenerator::build(topic, difficulty);
        };

        match self.request_question(config, topic, difficulty).await {
            Ok(content) => content,
            Err(err) => {
                warn!(topic = topic.name(), %err, "question generation fell back to template");
                TemplateGenerator::build(topic, difficulty)
            }
        }
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    prompt: String,
    answer: Option<String>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
