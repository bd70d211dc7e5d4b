use thiserror::Error;
use uuid::Uuid;

/// Submission rejected before any scoring happened
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("at least 2 prompts are required for comparison, found {found}")]
    NotEnoughPrompts { found: usize },
}

/// Comparison slot bookkeeping errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("cannot add more than {max} prompts")]
    Full { max: usize },

    #[error("cannot remove prompts below the minimum of {min}")]
    AtMinimum { min: usize },

    #[error("no prompt with id {0}")]
    NotFound(Uuid),
}

/// Scorer backend failures
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("environment variable {0} not found")]
    MissingApiKey(String),

    #[error("evaluation request failed: {0}")]
    Request(String),

    #[error("malformed evaluation response: {0}")]
    MalformedResponse(String),
}

/// Export failures; no artifact is left behind when one of these is returned
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("an export is already in progress")]
    InProgress,

    #[error("failed to render export: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a flow submission did not produce a result
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scoring(#[from] ScoreError),
}
