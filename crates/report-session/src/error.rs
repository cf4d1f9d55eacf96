use reportability_engine::NavigationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("Report not found: {0}")]
    NotFound(String),

    #[error("Report {0} is already final")]
    Finalized(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Save failed: {0}")]
    Save(#[from] SaveError),
}
