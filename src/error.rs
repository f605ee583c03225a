//! Error taxonomy for the rights engine.
//!
//! Only genuine storage failures travel as errors. "No applicable rule at
//! this level" is a value (`RuleOutcome::NotFound` in `rights::matcher`) and
//! recoverable collaborator hiccups (group lookups, preference reads) are
//! logged and degraded in place, so the error channel stays narrow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Backend(String),

    #[error("malformed rule record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
