#![forbid(unsafe_code)]

pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod run_store;

pub use practice_core::Clock;

pub use error::{GeneratorError, OrchestratorError, RunStoreError, ServicesInitError};
pub use generator::{
    AiGeneratorConfig, AiQuestionGenerator, QuestionContent, QuestionGenerator, QuestionSource,
    TemplateGenerator,
};
pub use orchestrator::{AutoModeOrchestrator, QuestionRequest};
pub use run_store::RunStore;
