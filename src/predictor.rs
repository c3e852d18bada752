//! Churn decision on top of the classifier

use crate::error::ChurnError;
use crate::feature_extractor::{FeatureExtractor, FeatureVector, FEATURE_COUNT};
use crate::models::classifier::{ClassProbabilities, Classifier};
use crate::types::client::ClientRecord;
use crate::types::prediction::PredictionResult;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, trace, warn, Level};

/// Churn probability above which a client is flagged.
///
/// Calibrated offline against the trained model to favour recall on churners.
/// It belongs to the model artifact, so it is a constant rather than configuration.
pub const CHURN_THRESHOLD: f64 = 0.40;

/// Allowed deviation of `p0 + p1` from 1.0 (float32 model outputs)
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Binary churn decision for a probability. The comparison is strict.
pub fn decide(probability: f64) -> u8 {
    u8::from(probability > CHURN_THRESHOLD)
}

/// Scores clients: feature extraction, one classifier call, thresholding.
pub struct ChurnPredictor {
    extractor: FeatureExtractor,
    classifier: Arc<dyn Classifier>,
}

impl ChurnPredictor {
    /// Wrap a loaded classifier.
    ///
    /// Refuses a classifier whose declared input width differs from the
    /// feature layout; such a model would score misaligned columns.
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self> {
        match classifier.input_arity() {
            Some(arity) if arity != FEATURE_COUNT => {
                anyhow::bail!(
                    "Classifier '{}' expects {} features, feature extractor produces {}",
                    classifier.name(),
                    arity,
                    FEATURE_COUNT
                );
            }
            Some(arity) => {
                info!(model = %classifier.name(), arity = arity, "Classifier input arity verified");
            }
            None => {
                warn!(
                    model = %classifier.name(),
                    "Classifier declares a dynamic input width, arity check skipped"
                );
            }
        }

        Ok(Self {
            extractor: FeatureExtractor::new(),
            classifier,
        })
    }

    /// Name of the underlying classifier
    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Score one client
    pub fn predict(&self, client: &ClientRecord) -> Result<PredictionResult, ChurnError> {
        let features = self.extractor.extract(client)?;
        self.predict_features(&features)
    }

    /// Score an already extracted feature vector
    pub fn predict_features(&self, features: &FeatureVector) -> Result<PredictionResult, ChurnError> {
        if tracing::enabled!(Level::TRACE) {
            let named: Vec<String> = features
                .iter_named()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            trace!(features = %named.join(", "), "Classifier input");
        }

        let probabilities = self
            .classifier
            .predict_probabilities(features)
            .map_err(ChurnError::prediction_failed)?;

        validate(&probabilities).map_err(ChurnError::prediction_failed)?;

        let probability = probabilities.class_1;
        let result = PredictionResult::new(decide(probability), probability);

        debug!(
            model = %self.classifier.name(),
            probability = probability,
            prediction = result.prediction,
            risk = result.risk_level.label(),
            "Prediction complete"
        );

        Ok(result)
    }
}

fn validate(p: &ClassProbabilities) -> Result<()> {
    for (class, value) in [(0, p.class_0), (1, p.class_1)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            anyhow::bail!("Class {} probability {} outside [0, 1]", class, value);
        }
    }

    let sum = p.class_0 + p.class_1;
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        anyhow::bail!("Class probabilities sum to {}, expected 1.0", sum);
    }

    Ok(())
}
