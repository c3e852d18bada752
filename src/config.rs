//! Configuration management for the churn prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Serve `POST /predict`
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// NATS request/reply transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// Answer prediction requests over NATS
    #[serde(default)]
    pub enabled: bool,
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub url: String,
    /// Subject prediction requests arrive on
    #[serde(default = "default_predict_subject")]
    pub predict_subject: String,
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX export of the trained classifier
    pub model_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

/// Request processing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum NATS requests processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds between metrics summaries (0 disables the reporter)
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_predict_subject() -> String {
    "churn.predict".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

fn default_workers() -> usize {
    8
}

fn default_metrics_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_nats_url(),
            predict_subject: default_predict_subject(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: "models/churn_xgboost.onnx".to_string(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `CHURN_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("CHURN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `CHURN__*` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CHURN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Whether at least one transport will accept requests
    pub fn has_transport(&self) -> bool {
        self.http.enabled || self.nats.enabled
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            nats: NatsConfig::default(),
            model: ModelConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.http.enabled);
        assert!(!config.nats.enabled);
        assert_eq!(config.http.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.nats.predict_subject, "churn.predict");
        assert_eq!(config.model.onnx_threads, 1);
        assert!(config.has_transport());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = from_toml(
            r#"
            [model]
            model_path = "/srv/models/churn.onnx"

            [nats]
            enabled = true
            "#,
        );

        assert_eq!(config.model.model_path, "/srv/models/churn.onnx");
        assert_eq!(config.model.onnx_threads, 1);
        assert!(config.nats.enabled);
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert!(config.http.enabled);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_model_section_required() {
        let result = Config::builder()
            .add_source(File::from_str("[http]\nenabled = true", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn test_shipped_config_file() {
        let config = AppConfig::load_from_path(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.model.model_path, "models/churn_xgboost.onnx");
        assert_eq!(config.pipeline.metrics_interval_secs, 60);
    }
}
