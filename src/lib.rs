//! Churn Prediction Service Library
//!
//! Scores bank clients for churn risk: a client record is turned into the
//! fixed feature layout of the trained classifier, scored, and thresholded
//! into a binary decision with a risk message.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod processor;
pub mod producer;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{ChurnError, ErrorResponse};
pub use feature_extractor::{FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use models::{ClassProbabilities, Classifier, OnnxClassifier};
pub use predictor::{ChurnPredictor, CHURN_THRESHOLD};
pub use processor::RequestProcessor;
pub use producer::ReplyProducer;
pub use types::{client::ClientRecord, prediction::PredictionResult, prediction::RiskLevel};
