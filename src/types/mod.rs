//! Type definitions for the churn prediction service

pub mod client;
pub mod prediction;

pub use client::ClientRecord;
pub use prediction::{PredictionResult, RiskLevel};
