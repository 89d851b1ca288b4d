use crate::types::MultibrainAnalysis;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("required collaborator not configured: {0}")]
    MissingCollaborator(&'static str),

    #[error("intent analysis failed: {0}")]
    IntentAnalysis(#[source] anyhow::Error),

    #[error("technical planning failed: {0}")]
    TechnicalPlanning(#[source] anyhow::Error),

    #[error("stage {stage} timed out after {after:?}")]
    StageTimeout { stage: String, after: Duration },

    #[error("analysis timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("analysis {0} was cancelled")]
    Cancelled(String),
}

impl CoordinatorError {
    /// Also true when an intent or planning failure was caused by that
    /// stage's own timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::StageTimeout { .. } => true,
            Self::IntentAnalysis(cause) | Self::TechnicalPlanning(cause) => cause
                .downcast_ref::<CoordinatorError>()
                .is_some_and(CoordinatorError::is_timeout),
            _ => false,
        }
    }
}

/// A failed run together with whatever the phases managed to produce.
#[derive(Debug, Error)]
#[error("analysis {correlation_id} failed: {error}")]
pub struct AnalysisFailure {
    pub correlation_id: String,
    pub partial: Box<MultibrainAnalysis>,
    #[source]
    pub error: CoordinatorError,
}

impl AnalysisFailure {
    pub fn new(partial: MultibrainAnalysis, error: CoordinatorError) -> Self {
        Self {
            correlation_id: partial.request.correlation_id.clone(),
            partial: Box::new(partial),
            error,
        }
    }

    /// Degraded but inspectable, as opposed to a hard failure with nothing in it.
    pub fn has_partial_result(&self) -> bool {
        !self.partial.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit channel is full")]
    Full,

    #[error("audit channel is closed")]
    Closed,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfidenceError {
    #[error("score for {key} is not a finite number")]
    NonFinite { key: String },

    #[error("score for {key} is outside [0, 1]: {value}")]
    OutOfRange { key: String, value: f64 },

    #[error("total weight is not positive: {0}")]
    InvalidWeight(f64),

    #[error("aggregate confidence is not a number")]
    NotANumber,
}
