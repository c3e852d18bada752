//! NATS reply producer for prediction outcomes

use crate::error::ChurnError;
use crate::types::prediction::PredictionResult;
use anyhow::Result;
use async_nats::{Client, HeaderMap, Subject};
use tracing::debug;

/// Header carrying the HTTP-style status of a reply
pub const STATUS_HEADER: &str = "Churn-Status";

/// Header carrying the error code of a failed reply
pub const ERROR_CODE_HEADER: &str = "Churn-Error";

/// Publishes prediction outcomes to the reply subject of each request
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    /// Create a new reply producer
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Reply with either the prediction or the error body
    pub async fn reply(
        &self,
        reply_to: Subject,
        outcome: &Result<PredictionResult, ChurnError>,
    ) -> Result<()> {
        let payload = encode_outcome(outcome)?;

        self.client
            .publish_with_headers(reply_to.clone(), reply_headers(outcome), payload.into())
            .await?;

        debug!(reply_to = %reply_to, ok = outcome.is_ok(), "Published prediction reply");

        Ok(())
    }
}

/// Status headers of a reply, mirroring the HTTP transport
pub fn reply_headers(outcome: &Result<PredictionResult, ChurnError>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match outcome {
        Ok(_) => headers.insert(STATUS_HEADER, "200"),
        Err(err) => {
            headers.insert(STATUS_HEADER, err.status_code().to_string());
            headers.insert(ERROR_CODE_HEADER, err.code());
        }
    }
    headers
}

/// JSON body of a reply; failures use the shared error shape
pub fn encode_outcome(outcome: &Result<PredictionResult, ChurnError>) -> Result<Vec<u8>> {
    let payload = match outcome {
        Ok(result) => serde_json::to_vec(result)?,
        Err(err) => serde_json::to_vec(&err.to_response())?,
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorResponse;

    fn header(headers: &HeaderMap, name: &str) -> Option<String> {
        headers.get(name).map(|value| value.as_str().to_string())
    }

    #[test]
    fn test_encode_success() {
        let payload = encode_outcome(&Ok(PredictionResult::new(0, 0.12))).unwrap();
        let decoded: PredictionResult = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded, PredictionResult::new(0, 0.12));
    }

    #[test]
    fn test_encode_failure() {
        let payload = encode_outcome(&Err(ChurnError::zero_denominator("Age"))).unwrap();
        let decoded: ErrorResponse = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded.error, "unprocessable_feature");
        assert!(decoded.detail.contains("Age"));
    }

    #[test]
    fn test_success_headers() {
        let headers = reply_headers(&Ok(PredictionResult::new(1, 0.9)));
        assert_eq!(header(&headers, STATUS_HEADER).as_deref(), Some("200"));
        assert_eq!(header(&headers, ERROR_CODE_HEADER), None);
    }

    #[test]
    fn test_failure_headers() {
        let headers = reply_headers(&Err(ChurnError::zero_denominator("NumOfProducts")));
        assert_eq!(header(&headers, STATUS_HEADER).as_deref(), Some("422"));
        assert_eq!(
            header(&headers, ERROR_CODE_HEADER).as_deref(),
            Some("unprocessable_feature")
        );

        let headers = reply_headers(&Err(ChurnError::prediction_failed(anyhow::anyhow!("boom"))));
        assert_eq!(header(&headers, STATUS_HEADER).as_deref(), Some("500"));
        assert_eq!(
            header(&headers, ERROR_CODE_HEADER).as_deref(),
            Some("prediction_failed")
        );
    }
}
