//! Engine errors

use thiserror::Error;

use tradefeed_rankings::NotifyError;
use tradefeed_scenario::ScenarioError;
use tradefeed_store::StoreError;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Invalid schedule: {0}")]
    Schedule(String),

    #[error("No traders in the store")]
    EmptyRoster,

    #[error("Symbol catalog is empty")]
    EmptyCatalog,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
