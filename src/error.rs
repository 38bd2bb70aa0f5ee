use thiserror::Error;

use crate::prompts::Task;

/// Search assistant error types
#[derive(Error, Debug)]
pub enum PicoError {
    #[error("OpenAI API error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tokio runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("LLM returned no content to parse")]
    EmptyResponse,

    #[error(
        "No API key found. Set it in the client configuration or export OPENAI_API_KEY in the environment."
    )]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failure of one of the generation entry points; the original cause is kept as `source`.
    #[error("{}", .task.failure_message())]
    Generation {
        task: Task,
        #[source]
        source: Box<PicoError>,
    },
}

impl PicoError {
    pub(crate) fn generation(task: Task, source: PicoError) -> Self {
        PicoError::Generation {
            task,
            source: Box::new(source),
        }
    }

    /// The innermost error, unwrapping any `Generation` layers
    pub fn cause(&self) -> &PicoError {
        match self {
            PicoError::Generation { source, .. } => source.cause(),
            other => other,
        }
    }
}

/// Result type alias for search assistant operations
pub type Result<T> = std::result::Result<T, PicoError>;
