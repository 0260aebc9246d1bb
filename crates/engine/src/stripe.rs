//! Stripe-backed payment source.
//!
//! Lists settled charges for the export window, correlates each charge back
//! to the internal transaction via metadata (falling back to the parent
//! payment intent, since metadata does not always propagate to the charge
//! synchronously) and normalizes amounts from integer minor units.
//!
//! Only rate-limit responses are retried, with bounded attempts and
//! randomized exponential backoff; every other processor failure aborts the
//! export immediately.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::money;
use crate::{CompletedPayment, EngineError, PaymentSource, Transaction};

/// Metadata key carrying the internal transaction id on charges/intents.
const TRANSACTION_ID_KEY: &str = "transaction_id";

/// Page size for charge listing.
const LIST_LIMIT: u32 = 100;

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub base_url: String,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            base_url: "https://api.stripe.com".to_string(),
        }
    }
}

/// Bounded retry with exponential backoff and jitter, applied to rate-limit
/// responses only.
#[derive(Clone, Debug)]
struct RetryPolicy {
    max_retries: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 15_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);
        // Jitter spreads concurrent exports hitting the same rate limit.
        let jitter = (rand::random::<f64>() - 0.5) * capped * self.jitter_factor * 2.0;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

pub struct StripePaymentSource {
    http: reqwest::Client,
    config: StripeConfig,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChargeList {
    data: Vec<Charge>,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct Charge {
    id: String,
    amount: i64,
    paid: bool,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
    payment_intent: Option<String>,
    balance_transaction: Option<BalanceTransaction>,
}

#[derive(Debug, Deserialize)]
struct BalanceTransaction {
    fee: i64,
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl StripePaymentSource {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            retry: RetryPolicy::default(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.config.base_url, path);

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay(attempt - 1);
                tracing::warn!(
                    "rate limited by payment processor, retry {}/{} after {:?}",
                    attempt,
                    self.retry.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .http
                .get(&url)
                .basic_auth(&self.config.secret_key, None::<&str>)
                .query(query)
                .send()
                .await
                .map_err(|err| {
                    EngineError::ExternalDependency(format!("payment processor: {err}"))
                })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                continue;
            }
            if !status.is_success() {
                return Err(EngineError::ExternalDependency(format!(
                    "payment processor returned {status} for {path}"
                )));
            }
            return response.json::<T>().await.map_err(|err| {
                EngineError::ExternalDependency(format!("payment processor: {err}"))
            });
        }

        Err(EngineError::ExternalDependency(format!(
            "payment processor rate limit persisted after {} retries for {path}",
            self.retry.max_retries
        )))
    }

    async fn list_charges(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Charge>, EngineError> {
        let mut charges = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("created[gte]".to_string(), start.timestamp().to_string()),
                ("created[lt]".to_string(), end.timestamp().to_string()),
                ("limit".to_string(), LIST_LIMIT.to_string()),
                (
                    "expand[]".to_string(),
                    "data.balance_transaction".to_string(),
                ),
            ];
            if let Some(cursor) = &starting_after {
                query.push(("starting_after".to_string(), cursor.clone()));
            }

            let page: ChargeList = self.get_json("/v1/charges", &query).await?;
            let last_id = page.data.last().map(|charge| charge.id.clone());
            charges.extend(page.data);

            match (page.has_more, last_id) {
                (true, Some(cursor)) => starting_after = Some(cursor),
                _ => break,
            }
        }

        Ok(charges)
    }

    /// Resolves the internal transaction id for a charge, falling back to the
    /// parent payment intent's metadata.
    async fn transaction_id_for(&self, charge: &Charge) -> Result<i32, EngineError> {
        if let Some(raw) = charge.metadata.get(TRANSACTION_ID_KEY) {
            return parse_transaction_id(&charge.id, raw);
        }

        let Some(intent_id) = &charge.payment_intent else {
            return Err(EngineError::Integrity(format!(
                "charge {} carries no transaction id and no payment intent",
                charge.id
            )));
        };

        let intent: PaymentIntent = self
            .get_json(&format!("/v1/payment_intents/{intent_id}"), &[])
            .await?;
        match intent.metadata.get(TRANSACTION_ID_KEY) {
            Some(raw) => parse_transaction_id(&charge.id, raw),
            None => Err(EngineError::Integrity(format!(
                "charge {} carries no transaction id metadata",
                charge.id
            ))),
        }
    }
}

fn parse_transaction_id(charge_id: &str, raw: &str) -> Result<i32, EngineError> {
    raw.parse::<i32>().map_err(|_| {
        EngineError::Integrity(format!(
            "charge {charge_id} carries malformed transaction id \"{raw}\""
        ))
    })
}

#[async_trait]
impl PaymentSource for StripePaymentSource {
    async fn completed_payments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        _transactions: &[Transaction],
    ) -> Result<HashMap<i32, CompletedPayment>, EngineError> {
        let charges = self.list_charges(start, end).await?;
        let mut payments = HashMap::new();

        for charge in &charges {
            if !charge.paid {
                continue;
            }

            let transaction_id = self.transaction_id_for(charge).await?;
            let fee = charge
                .balance_transaction
                .as_ref()
                .map(|bt| bt.fee)
                .ok_or_else(|| {
                    EngineError::ExternalDependency(format!(
                        "charge {} is missing its balance transaction",
                        charge.id
                    ))
                })?;
            let charge_created =
                DateTime::from_timestamp(charge.created, 0).ok_or_else(|| {
                    EngineError::ExternalDependency(format!(
                        "charge {} has invalid created timestamp {}",
                        charge.id, charge.created
                    ))
                })?;

            payments.insert(
                transaction_id,
                CompletedPayment {
                    transaction_id,
                    amount: money::from_minor(charge.amount),
                    fee: money::from_minor(fee),
                    charge_created,
                },
            );
        }

        Ok(payments)
    }
}
