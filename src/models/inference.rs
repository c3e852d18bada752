//! ONNX Runtime backed churn classifier

use crate::config::ModelConfig;
use crate::feature_extractor::FeatureVector;
use crate::models::classifier::{ClassProbabilities, Classifier};
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::Mutex;
use tracing::debug;

/// Churn classifier running an ONNX export of the trained model.
///
/// Sessions need exclusive access to run, so concurrent requests serialise on
/// the inner lock.
pub struct OnnxClassifier {
    name: String,
    input_arity: Option<usize>,
    model: Mutex<LoadedModel>,
}

impl OnnxClassifier {
    /// Load the classifier described by configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let model = loader.load(&config.model_path)?;
        Ok(Self::from_model(model))
    }

    /// Wrap an already loaded model
    pub fn from_model(model: LoadedModel) -> Self {
        Self {
            name: model.name.clone(),
            input_arity: model.input_arity,
            model: Mutex::new(model),
        }
    }

    fn run(model: &mut LoadedModel, features: &[f32]) -> Result<ClassProbabilities> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        extract_probabilities(&outputs, &model.output_name, &model.name)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_arity(&self) -> Option<usize> {
        self.input_arity
    }

    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ClassProbabilities> {
        let input = features.to_f32_vec();
        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        Self::run(&mut model, &input)
    }
}

/// Extract class probabilities from model output.
/// Handles both tensor outputs (XGBoost, sklearn) and seq(map) outputs (LightGBM, CatBoost)
fn extract_probabilities(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
    model_name: &str,
) -> Result<ClassProbabilities> {
    let output = outputs
        .get(output_name)
        .with_context(|| format!("Model output '{}' missing", output_name))?;

    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let probabilities = probabilities_from_tensor(shape, data)?;
        debug!(model = %model_name, p1 = probabilities.class_1, "Extracted from tensor");
        return Ok(probabilities);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        let probabilities = probabilities_from_sequence_map(output)?;
        debug!(model = %model_name, p1 = probabilities.class_1, "Extracted from seq(map)");
        return Ok(probabilities);
    }

    anyhow::bail!(
        "Unsupported output type {:?} for '{}'",
        output.dtype(),
        output_name
    )
}

/// Extract probabilities from seq(map(int64, float)) format
fn probabilities_from_sequence_map(output: &ort::value::DynValue) -> Result<ClassProbabilities> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // batch_size is always 1
    let map_value = maps.first().context("Empty probability sequence")?;
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    let class_prob = |class: i64| {
        kv_pairs
            .iter()
            .find(|(class_id, _)| *class_id == class)
            .map(|(_, prob)| *prob as f64)
    };

    match (class_prob(0), class_prob(1)) {
        (Some(p0), Some(p1)) => Ok(ClassProbabilities::new(p0, p1)),
        _ => anyhow::bail!("Probability map lacks class 0 or class 1: {:?}", kv_pairs),
    }
}

/// Extract probabilities from a `[1, 2]` or `[2]` tensor
fn probabilities_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Result<ClassProbabilities> {
    let dims: Vec<i64> = shape.iter().copied().collect();

    if !matches!(dims.as_slice(), [1, 2] | [2]) || data.len() != 2 {
        anyhow::bail!(
            "Expected probabilities of shape [1, 2], got {:?} ({} values)",
            dims,
            data.len()
        );
    }

    Ok(ClassProbabilities::new(data[0] as f64, data[1] as f64))
}
