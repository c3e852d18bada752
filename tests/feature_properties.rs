/// Property-based tests for feature extraction and the churn decision
use churn_prediction_service::{
    predictor::decide, ChurnError, ClientRecord, FeatureExtractor, CHURN_THRESHOLD, FEATURE_COUNT,
};
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("France".to_string()),
        Just("germany".to_string()),
        Just(" SPAIN ".to_string()),
        Just("Male".to_string()),
        Just("female".to_string()),
        Just("GOLD".to_string()),
        Just("platinum".to_string()),
        Just("Silver".to_string()),
        Just("DIAMOND".to_string()),
        "\\PC{0,12}",
    ]
}

prop_compose! {
    fn valid_client()(
        credit_score in 300i64..900,
        geography in token(),
        gender in token(),
        age in 1i64..100,
        tenure in 0i64..15,
        balance in prop_oneof![Just(0.0), 0.0f64..300_000.0],
        num_of_products in 1i64..5,
        has_cr_card in 0i64..2,
        is_active_member in 0i64..2,
        estimated_salary in 1.0f64..250_000.0,
        satisfaction_score in 1i64..6,
        points_earned in 0i64..1_000,
        card_type in token(),
    ) -> ClientRecord {
        ClientRecord {
            credit_score,
            geography,
            gender,
            age,
            tenure,
            balance,
            num_of_products,
            has_cr_card,
            is_active_member,
            estimated_salary,
            satisfaction_score,
            points_earned,
            card_type,
        }
    }
}

proptest! {
    #[test]
    fn valid_clients_produce_finite_vectors(client in valid_client()) {
        let features = FeatureExtractor::new().extract(&client).unwrap();
        prop_assert_eq!(features.as_slice().len(), FEATURE_COUNT);
        prop_assert!(features.as_slice().iter().all(|v| v.is_finite()));
        prop_assert!(features.to_f32_vec().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn balance_beyond_f32_range_names_balance(
        mut client in valid_client(),
        balance in 3.5e38f64..1e300,
    ) {
        client.balance = balance;
        match FeatureExtractor::new().extract(&client) {
            Err(ChurnError::UnprocessableFeature { field, .. }) => prop_assert_eq!(field, "Balance"),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn extraction_is_deterministic(client in valid_client()) {
        let extractor = FeatureExtractor::new();
        let first = extractor.extract(&client).unwrap();
        let second = extractor.extract(&client).unwrap();

        let first_bits: Vec<u64> = first.as_slice().iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.as_slice().iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn indicators_are_mutually_exclusive(client in valid_client()) {
        let features = FeatureExtractor::new().extract(&client).unwrap();
        let value = |name: &str| features.get(name).unwrap();

        for name in [
            "HasBalance",
            "Geography_Germany",
            "Geography_Spain",
            "Gender_Male",
            "Card Type_GOLD",
            "Card Type_PLATINUM",
            "Card Type_SILVER",
        ] {
            prop_assert!(value(name) == 0.0 || value(name) == 1.0);
        }

        prop_assert!(value("Geography_Germany") + value("Geography_Spain") <= 1.0);
        prop_assert!(
            value("Card Type_GOLD") + value("Card Type_PLATINUM") + value("Card Type_SILVER") <= 1.0
        );
    }

    #[test]
    fn raw_fields_pass_through_in_position(client in valid_client()) {
        let features = FeatureExtractor::new().extract(&client).unwrap();
        let values = features.as_slice();

        prop_assert_eq!(values[0], client.credit_score as f64);
        prop_assert_eq!(values[1], client.age as f64);
        prop_assert_eq!(values[3], client.balance);
        prop_assert_eq!(values[7], client.estimated_salary);
        prop_assert_eq!(values[9], client.points_earned as f64);
        prop_assert_eq!(values[14], client.tenure as f64 / client.age as f64);
    }

    #[test]
    fn zero_age_always_names_age(mut client in valid_client()) {
        client.age = 0;
        match FeatureExtractor::new().extract(&client) {
            Err(ChurnError::UnprocessableFeature { field, .. }) => prop_assert_eq!(field, "Age"),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn zero_products_always_names_num_of_products(mut client in valid_client()) {
        client.num_of_products = 0;
        match FeatureExtractor::new().extract(&client) {
            Err(ChurnError::UnprocessableFeature { field, .. }) => {
                prop_assert_eq!(field, "NumOfProducts")
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn decision_matches_strict_threshold(p in 0.0f64..=1.0) {
        prop_assert_eq!(decide(p) == 1, p > CHURN_THRESHOLD);
    }
}

#[test]
fn threshold_boundary() {
    assert_eq!(decide(0.40), 0);
    assert_eq!(decide(0.4000001), 1);
}
