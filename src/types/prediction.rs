//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Binary risk classification returned to callers.
///
/// Serialized in Portuguese because the downstream consumer displays the
/// message as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Baixo Risco")]
    Low,
    #[serde(rename = "Alto Risco")]
    High,
}

impl RiskLevel {
    /// Map a binary churn decision to its risk level
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    /// English label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

/// Outcome of scoring one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 if the client is predicted to churn, 0 otherwise
    pub prediction: u8,

    /// Probability of the churn class (0.0 - 1.0)
    pub churn_probability: f64,

    /// Risk classification derived from `prediction`
    #[serde(rename = "risk_message")]
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Build a result from a decision and the probability it was taken on
    pub fn new(prediction: u8, churn_probability: f64) -> Self {
        Self {
            prediction,
            churn_probability,
            risk_level: RiskLevel::from_prediction(prediction),
        }
    }

    /// Whether the client was classified as a churner
    pub fn is_churn(&self) -> bool {
        self.prediction == 1
    }
}
