use thiserror::Error;

use resq_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ModelError),

    #[error("no operation registered for stage: {0}")]
    MissingOperation(String),

    #[error("operation registered for unknown stage: {0}")]
    UnknownStage(String),
}
