//! Client record data structures for churn prediction

use serde::{Deserialize, Serialize};

/// A single bank client as submitted for churn scoring.
///
/// Field names on the wire follow the column names of the training dataset.
/// The spellings with spaces (and their underscore forms) are accepted as aliases
/// so that rows exported straight from the dataset can be posted unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Credit score
    #[serde(rename = "CreditScore")]
    pub credit_score: i64,

    /// Country of residence ("France", "Germany", "Spain")
    #[serde(rename = "Geography")]
    pub geography: String,

    /// "Male" or "Female"
    #[serde(rename = "Gender")]
    pub gender: String,

    /// Age in years
    #[serde(rename = "Age")]
    pub age: i64,

    /// Years as a client
    #[serde(rename = "Tenure")]
    pub tenure: i64,

    /// Account balance
    #[serde(rename = "Balance")]
    pub balance: f64,

    /// Number of bank products held
    #[serde(rename = "NumOfProducts")]
    pub num_of_products: i64,

    /// 1 if the client holds a credit card
    #[serde(rename = "HasCrCard")]
    pub has_cr_card: i64,

    /// 1 if the client is an active member
    #[serde(rename = "IsActiveMember")]
    pub is_active_member: i64,

    /// Estimated yearly salary
    #[serde(rename = "EstimatedSalary")]
    pub estimated_salary: f64,

    /// Complaint resolution satisfaction score
    #[serde(
        rename = "SatisfactionScore",
        alias = "Satisfaction Score",
        alias = "Satisfaction_Score"
    )]
    pub satisfaction_score: i64,

    /// Loyalty points earned with the card
    #[serde(rename = "PointsEarned", alias = "Point Earned", alias = "Point_Earned")]
    pub points_earned: i64,

    /// Card tier ("GOLD", "PLATINUM", "SILVER", "DIAMOND", ...)
    #[serde(rename = "CardType", alias = "Card Type")]
    pub card_type: String,
}

/// Normalise a categorical token the way the training pipeline did:
/// surrounding whitespace removed, first letter upper case, the rest lower case.
pub fn title_case(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl ClientRecord {
    /// Geography normalised for indicator matching.
    pub fn normalized_geography(&self) -> String {
        title_case(&self.geography)
    }

    /// Gender normalised for indicator matching.
    pub fn normalized_gender(&self) -> String {
        title_case(&self.gender)
    }

    /// Card tier as matched against the card indicators (upper case, untrimmed).
    pub fn normalized_card_type(&self) -> String {
        self.card_type.to_uppercase()
    }

    /// Sample record used by tests and the test client.
    pub fn sample() -> Self {
        Self {
            credit_score: 650,
            geography: "France".to_string(),
            gender: "Female".to_string(),
            age: 40,
            tenure: 5,
            balance: 0.0,
            num_of_products: 2,
            has_cr_card: 1,
            is_active_member: 1,
            estimated_salary: 50000.0,
            satisfaction_score: 3,
            points_earned: 400,
            card_type: "Silver".to_string(),
        }
    }
}
