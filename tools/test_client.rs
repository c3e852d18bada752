//! Test Prediction Client
//!
//! Generates client records and sends them as NATS prediction requests.

use churn_prediction_service::{ClientRecord, ErrorResponse, PredictionResult};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Client record generator for testing
struct ClientGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ClientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a long-standing, engaged client
    fn generate_loyal(&mut self) -> ClientRecord {
        ClientRecord {
            credit_score: self.rng.gen_range(600..850),
            geography: self.random_choice(&["France", "Spain", "Germany"]).to_string(),
            gender: self.random_choice(&["Male", "Female"]).to_string(),
            age: self.rng.gen_range(25..45),
            tenure: self.rng.gen_range(4..11),
            balance: self.random_balance(0.5),
            num_of_products: self.rng.gen_range(1..3),
            has_cr_card: self.rng.gen_range(0..2),
            is_active_member: 1,
            estimated_salary: self.rng.gen_range(20_000.0..200_000.0),
            satisfaction_score: self.rng.gen_range(3..6),
            points_earned: self.rng.gen_range(300..1000),
            card_type: self.random_choice(&["GOLD", "PLATINUM", "SILVER", "DIAMOND"]).to_string(),
        }
    }

    /// Generate a client with the usual churn markers
    fn generate_at_risk(&mut self) -> ClientRecord {
        ClientRecord {
            credit_score: self.rng.gen_range(350..650),
            geography: "Germany".to_string(), // Highest churn region in training data
            gender: "Female".to_string(),
            age: self.rng.gen_range(45..70), // Older clients
            tenure: self.rng.gen_range(0..4),
            balance: self.random_balance(0.9),
            num_of_products: self.rng.gen_range(3..5), // Many products
            has_cr_card: self.rng.gen_range(0..2),
            is_active_member: 0, // Inactive
            estimated_salary: self.rng.gen_range(10_000.0..120_000.0),
            satisfaction_score: self.rng.gen_range(1..3),
            points_earned: self.rng.gen_range(100..500),
            card_type: self.random_choice(&["gold", "Silver", "DIAMOND"]).to_string(),
        }
    }

    fn random_balance(&mut self, p_nonzero: f64) -> f64 {
        if self.rng.gen_bool(p_nonzero) {
            self.rng.gen_range(1_000.0..250_000.0)
        } else {
            0.0
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("churn.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let risk_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        risk_rate = risk_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, risk_rate, delay_ms).await;
        }
    };

    let mut generator = ClientGenerator::new();
    let mut rng = rand::thread_rng();

    let mut high_risk = 0;
    let mut low_risk = 0;
    let mut failed = 0;

    for i in 0..count {
        let record = if rng.gen_bool(risk_rate) {
            generator.generate_at_risk()
        } else {
            generator.generate_loyal()
        };

        let payload = serde_json::to_vec(&record)?;
        let reply = client.request(subject.to_string(), payload.into()).await?;

        match serde_json::from_slice::<PredictionResult>(&reply.payload) {
            Ok(result) if result.is_churn() => high_risk += 1,
            Ok(_) => low_risk += 1,
            Err(_) => {
                failed += 1;
                match serde_json::from_slice::<ErrorResponse>(&reply.payload) {
                    Ok(err) => warn!(error = %err.error, detail = %err.detail, "Request failed"),
                    Err(e) => warn!(error = %e, "Unreadable reply"),
                }
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} high risk, {} low risk, {} failed)",
                i + 1,
                count,
                high_risk,
                low_risk,
                failed
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! {} requests ({} high risk, {} low risk, {} failed)",
        count, high_risk, low_risk, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, risk_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ClientGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(risk_rate) {
            generator.generate_at_risk()
        } else {
            generator.generate_loyal()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample client {}:\n{}", i + 1, serde_json::to_string_pretty(&record)?);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
