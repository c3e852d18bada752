//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
    /// Width of the input tensor, `None` if the dimension is symbolic
    pub input_arity: Option<usize>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load the churn model from file. The file stem becomes the model name.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("churn_model")
            .to_string();

        self.load_model(path, &name)
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input = session
            .inputs
            .first()
            .context("Model declares no inputs")?;
        let input_name = input.name.clone();

        // [batch, features]; a negative width means the exporter left it symbolic
        let input_arity = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.last().copied())
            .filter(|&width| width > 0)
            .map(|width| width as usize);

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            input_arity = ?input_arity,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            output_name,
            input_arity,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let loader = ModelLoader::default();
        let err = loader
            .load("models/does_not_exist.onnx")
            .err()
            .expect("loading a missing file must fail");
        assert!(err.to_string().contains("not found"));
    }
}
