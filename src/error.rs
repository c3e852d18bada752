//! Error taxonomy for a single prediction request

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed cause carried by [`ChurnError::PredictionFailed`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a prediction request can fail.
///
/// Failures are scoped to the request that produced them; none is retried.
#[derive(Debug, Error)]
pub enum ChurnError {
    /// Request payload is missing a field or has a field of the wrong type
    #[error("invalid client record: {reason}")]
    SchemaViolation { reason: String },

    /// A feature could not be derived into a finite value
    #[error("unprocessable feature '{field}': {reason}")]
    UnprocessableFeature { field: &'static str, reason: String },

    /// The classifier errored or returned an unexpected shape
    #[error("prediction failed: {source}")]
    PredictionFailed {
        #[source]
        source: BoxError,
    },
}

impl ChurnError {
    /// Denominator of a derived ratio is zero
    pub fn zero_denominator(field: &'static str) -> Self {
        ChurnError::UnprocessableFeature {
            field,
            reason: format!("{field} must be non-zero (used as a divisor)"),
        }
    }

    /// Wrap any classifier-side failure
    pub fn prediction_failed(source: impl Into<BoxError>) -> Self {
        ChurnError::PredictionFailed {
            source: source.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ChurnError::SchemaViolation { .. } => "schema_violation",
            ChurnError::UnprocessableFeature { .. } => "unprocessable_feature",
            ChurnError::PredictionFailed { .. } => "prediction_failed",
        }
    }

    /// HTTP-style status shared by every transport
    pub fn status_code(&self) -> u16 {
        match self {
            ChurnError::SchemaViolation { .. } | ChurnError::UnprocessableFeature { .. } => 422,
            ChurnError::PredictionFailed { .. } => 500,
        }
    }

    /// Whether the caller sent something that can never succeed
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ChurnError::PredictionFailed { .. })
    }

    /// Wire representation of this failure
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code().to_string(),
            detail: self.to_string(),
        }
    }
}

/// Failure body returned by every transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// One of `schema_violation`, `unprocessable_feature`, `prediction_failed`
    pub error: String,
    /// Human-readable cause
    pub detail: String,
}
