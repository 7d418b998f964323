use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("document {0} is not ready")]
    NotReady(String),
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
