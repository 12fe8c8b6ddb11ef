use thiserror::Error;

use crate::wire::problem::AcmeProblem;

/// Error taxonomy for the renewal engine.
///
/// Variants map directly onto the five error kinds the state driver
/// must distinguish: configuration errors never retry, transient
/// protocol errors retry against the budget, terminal protocol errors
/// abort immediately, install errors are a mix, and allocation failure
/// is fatal.
#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transient protocol error: {0}")]
    Transient(String),

    #[error("terminal protocol error: {0}")]
    Terminal(String),

    #[error("server reported problem: {0}")]
    Problem(#[from] AcmeProblem),

    #[error("install error: {0}")]
    InstallTerminal(String),

    #[error("install contention: {0}")]
    InstallTransient(String),

    #[error("http transport error: {0}")]
    Http(String),

    #[error("malformed response: missing field {0}")]
    MissingField(&'static str),

    #[error("malformed response: missing header {0}")]
    MissingHeader(&'static str),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("out of memory")]
    OutOfMemory,
}

pub type AcmeResult<T> = Result<T, AcmeError>;

/// Retry classification used by the state driver to decide whether a
/// failure decrements the retry budget or aborts the renewal outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Abort,
}

impl AcmeError {
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            AcmeError::Transient(_) | AcmeError::InstallTransient(_) | AcmeError::Http(_) => {
                Disposition::Retry
            }
            AcmeError::MissingField(_) | AcmeError::MissingHeader(_) | AcmeError::Json(_) => {
                Disposition::Retry
            }
            AcmeError::Problem(problem) => {
                if problem.is_retryable() {
                    Disposition::Retry
                } else {
                    Disposition::Abort
                }
            }
            AcmeError::Configuration(_)
            | AcmeError::Terminal(_)
            | AcmeError::InstallTerminal(_)
            | AcmeError::OutOfMemory => Disposition::Abort,
        }
    }
}
