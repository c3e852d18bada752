//! Transport-independent request handling

use crate::error::ChurnError;
use crate::metrics::PredictionMetrics;
use crate::predictor::ChurnPredictor;
use crate::types::client::ClientRecord;
use crate::types::prediction::PredictionResult;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Runs one prediction request end to end and records its outcome.
///
/// Shared by every transport so that logging and metrics do not depend on
/// how the request arrived.
#[derive(Clone)]
pub struct RequestProcessor {
    predictor: Arc<ChurnPredictor>,
    metrics: Arc<PredictionMetrics>,
}

impl RequestProcessor {
    pub fn new(predictor: Arc<ChurnPredictor>, metrics: Arc<PredictionMetrics>) -> Self {
        Self { predictor, metrics }
    }

    pub fn predictor(&self) -> &ChurnPredictor {
        &self.predictor
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }

    /// Parse a raw JSON payload and score it on the blocking pool
    pub async fn process_payload_blocking(
        &self,
        payload: &[u8],
    ) -> Result<PredictionResult, ChurnError> {
        let client = self.parse(payload)?;
        self.process_blocking(client).await
    }

    /// Score on the blocking pool.
    ///
    /// Classifier calls are CPU-bound and serialise on the session lock, so
    /// they must not occupy async worker threads.
    pub async fn process_blocking(
        &self,
        client: ClientRecord,
    ) -> Result<PredictionResult, ChurnError> {
        let processor = self.clone();
        match tokio::task::spawn_blocking(move || processor.process(&client)).await {
            Ok(outcome) => outcome,
            Err(e) => Err(self.reject(ChurnError::prediction_failed(e))),
        }
    }

    fn parse(&self, payload: &[u8]) -> Result<ClientRecord, ChurnError> {
        serde_json::from_slice::<ClientRecord>(payload).map_err(|e| {
            self.reject(ChurnError::SchemaViolation {
                reason: e.to_string(),
            })
        })
    }

    /// Score an already parsed client record
    pub fn process(&self, client: &ClientRecord) -> Result<PredictionResult, ChurnError> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        match self.predictor.predict(client) {
            Ok(result) => {
                let processing_time = start_time.elapsed();
                self.metrics.record_prediction(
                    processing_time,
                    result.churn_probability,
                    result.is_churn(),
                );

                debug!(
                    request_id = %request_id,
                    probability = result.churn_probability,
                    prediction = result.prediction,
                    processing_time_us = processing_time.as_micros() as u64,
                    "Client scored"
                );

                Ok(result)
            }
            Err(err) => {
                self.record_failure(request_id, &err);
                Err(err)
            }
        }
    }

    /// Record and log a request that failed before reaching the predictor
    pub fn reject(&self, err: ChurnError) -> ChurnError {
        self.record_failure(Uuid::new_v4(), &err);
        err
    }

    fn record_failure(&self, request_id: Uuid, err: &ChurnError) {
        self.metrics.record_failure(err.code());

        if err.is_client_error() {
            warn!(request_id = %request_id, code = err.code(), error = %err, "Request rejected");
        } else {
            error!(request_id = %request_id, code = err.code(), error = %err, "Prediction failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureVector;
    use crate::models::classifier::{ClassProbabilities, Classifier};
    use std::sync::atomic::Ordering;

    struct ConstantClassifier(f64);

    impl Classifier for ConstantClassifier {
        fn name(&self) -> &str {
            "constant"
        }

        fn input_arity(&self) -> Option<usize> {
            None
        }

        fn predict_probabilities(&self, _features: &FeatureVector) -> anyhow::Result<ClassProbabilities> {
            Ok(ClassProbabilities::new(1.0 - self.0, self.0))
        }
    }

    fn processor(p1: f64) -> RequestProcessor {
        let predictor = ChurnPredictor::new(Arc::new(ConstantClassifier(p1))).unwrap();
        RequestProcessor::new(Arc::new(predictor), Arc::new(PredictionMetrics::new()))
    }

    #[tokio::test]
    async fn test_payload_scored() {
        let processor = processor(0.7);
        let payload = serde_json::to_vec(&ClientRecord::sample()).unwrap();

        let result = processor.process_payload_blocking(&payload).await.unwrap();
        assert_eq!(result.prediction, 1);
        assert_eq!(processor.metrics().churn_predicted.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_blocking_path_scores() {
        let processor = processor(0.2);
        let payload = serde_json::to_vec(&ClientRecord::sample()).unwrap();

        let result = processor.process_payload_blocking(&payload).await.unwrap();
        assert_eq!(result.prediction, 0);
        assert_eq!(processor.metrics().requests.load(Ordering::Relaxed), 1);

        let err = processor.process_payload_blocking(b"not json").await.unwrap_err();
        assert_eq!(err.code(), "schema_violation");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_schema_violation() {
        let processor = processor(0.7);

        let err = processor
            .process_payload_blocking(br#"{"CreditScore": "high"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "schema_violation");
        assert_eq!(
            processor.metrics().get_failures_by_code().get("schema_violation"),
            Some(&1)
        );
    }

    #[test]
    fn test_feature_failure_recorded() {
        let processor = processor(0.7);
        let mut client = ClientRecord::sample();
        client.num_of_products = 0;

        let err = processor.process(&client).unwrap_err();
        assert_eq!(err.code(), "unprocessable_feature");
        assert_eq!(processor.metrics().failures(), 1);
        assert_eq!(processor.metrics().requests.load(Ordering::Relaxed), 1);
    }
}
