//! Feature extraction for churn model inference.
//!
//! This module turns a client record into the exact feature layout the
//! classifier was fitted on. The classifier consumes features by position, so a
//! wrong order does not fail; it silently scores the wrong columns. The order
//! lives in [`FEATURE_NAMES`] and nowhere else.

use crate::error::ChurnError;
use crate::types::client::ClientRecord;

/// Number of features the classifier expects.
pub const FEATURE_COUNT: usize = 21;

/// Feature names in training order (matches `feature_names_in_` of the fitted model).
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    // Raw numeric (10)
    "CreditScore",
    "Age",
    "Tenure",
    "Balance",
    "NumOfProducts",
    "HasCrCard",
    "IsActiveMember",
    "EstimatedSalary",
    "Satisfaction Score",
    "Point Earned",
    // Engineered (5)
    "CreditScoreGivenAge",
    "HasBalance",
    "PointsPerProduct",
    "BalanceSalaryRatio",
    "TenureByAge",
    // One-hot, baseline category dropped (6)
    "Geography_Germany",
    "Geography_Spain",
    "Gender_Male",
    "Card Type_GOLD",
    "Card Type_PLATINUM",
    "Card Type_SILVER",
];

/// Ordered, immutable model input for one client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Feature values in training order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Values narrowed to `f32` for tensor input
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }

    /// Look a feature up by its training-time name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }

    /// `(name, value)` pairs in training order
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Feature extractor that transforms client records into model input features.
///
/// Matches the preprocessing done in the training notebook.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a client record.
    ///
    /// Fails with [`ChurnError::UnprocessableFeature`] when a ratio denominator is
    /// zero or any resulting value is not finite; a NaN fed to the classifier
    /// would produce a score instead of an error.
    pub fn extract(&self, client: &ClientRecord) -> Result<FeatureVector, ChurnError> {
        let age = non_zero("Age", client.age as f64)?;
        let num_of_products = non_zero("NumOfProducts", client.num_of_products as f64)?;
        let estimated_salary = non_zero("EstimatedSalary", client.estimated_salary)?;

        let geography = client.normalized_geography();
        let gender = client.normalized_gender();
        let card_type = client.normalized_card_type();

        let values = [
            client.credit_score as f64,
            client.age as f64,
            client.tenure as f64,
            client.balance,
            client.num_of_products as f64,
            client.has_cr_card as f64,
            client.is_active_member as f64,
            client.estimated_salary,
            client.satisfaction_score as f64,
            client.points_earned as f64,
            // CreditScoreGivenAge
            client.credit_score as f64 / age,
            // HasBalance
            indicator(client.balance > 0.0),
            // PointsPerProduct
            client.points_earned as f64 / num_of_products,
            // BalanceSalaryRatio
            client.balance / estimated_salary,
            // TenureByAge
            client.tenure as f64 / age,
            indicator(geography == "Germany"),
            indicator(geography == "Spain"),
            indicator(gender == "Male"),
            indicator(card_type == "GOLD"),
            indicator(card_type == "PLATINUM"),
            indicator(card_type == "SILVER"),
        ];

        // Checked in f32 range: the classifier receives the narrowed values
        if let Some(i) = values.iter().position(|&v| !fits_tensor(v)) {
            return Err(ChurnError::UnprocessableFeature {
                field: FEATURE_NAMES[i],
                reason: format!("value {} is not finite as a 32-bit float", values[i]),
            });
        }

        Ok(FeatureVector { values })
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn non_zero(field: &'static str, value: f64) -> Result<f64, ChurnError> {
    if value == 0.0 {
        Err(ChurnError::zero_denominator(field))
    } else {
        Ok(value)
    }
}

fn fits_tensor(value: f64) -> bool {
    value.is_finite() && value.abs() <= f32::MAX as f64
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}
