//! Classifier collaborator interface

use crate::feature_extractor::FeatureVector;
use anyhow::Result;

/// Per-class probabilities for a single feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    /// Probability of "retained"
    pub class_0: f64,
    /// Probability of "churned"
    pub class_1: f64,
}

impl ClassProbabilities {
    pub fn new(class_0: f64, class_1: f64) -> Self {
        Self { class_0, class_1 }
    }
}

/// A trained binary classifier.
///
/// Implementations are loaded once at startup and shared read-only across every
/// request, so `predict_probabilities` must be safe to call concurrently.
pub trait Classifier: Send + Sync {
    /// Name used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Number of input features the artifact declares, `None` when dynamic
    fn input_arity(&self) -> Option<usize>;

    /// Score one feature vector
    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ClassProbabilities>;
}
