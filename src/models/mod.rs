//! ML model inference components

pub mod classifier;
pub mod inference;
pub mod loader;

pub use classifier::{ClassProbabilities, Classifier};
pub use inference::OnnxClassifier;
pub use loader::ModelLoader;
