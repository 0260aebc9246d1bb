//! Payment sources: where "completed payments" come from.
//!
//! A [`CompletedPayment`] is the processor-side view of one settled charge.
//! It is rebuilt from scratch for every export run and never persisted; the
//! reconciliation engine cross-checks it against the internal ledger.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{EngineError, Transaction, TransactionStatus};

/// One settled payment as seen by the payment processor.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedPayment {
    pub transaction_id: i32,
    /// Gross amount captured, in major units.
    pub amount: Decimal,
    /// The processor's cut, in major units.
    pub fee: Decimal,
    pub charge_created: DateTime<Utc>,
}

/// Source of settled payments for a date range.
///
/// Implementations are read-only against the processor; the whole export
/// fails if the payment set cannot be fetched completely.
#[async_trait]
pub trait PaymentSource: Send + Sync {
    /// Returns all payments settled in `[start, end)`, keyed by the internal
    /// transaction id they originate from.
    async fn completed_payments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        transactions: &[Transaction],
    ) -> Result<HashMap<i32, CompletedPayment>, EngineError>;
}

/// Fee percentage applied by [`LocalPaymentSource`]: 1%.
const LOCAL_FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Degraded/test-mode source: treats every locally completed transaction as
/// an already-settled payment.
///
/// This performs no real reconciliation; it only exists so environments
/// without a payment processor can exercise the export pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalPaymentSource;

#[async_trait]
impl PaymentSource for LocalPaymentSource {
    async fn completed_payments(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        transactions: &[Transaction],
    ) -> Result<HashMap<i32, CompletedPayment>, EngineError> {
        let payments = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| {
                let fee = (tx.amount * LOCAL_FEE_RATE).round_dp(2);
                (
                    tx.id,
                    CompletedPayment {
                        transaction_id: tx.id,
                        amount: tx.amount,
                        fee,
                        charge_created: tx.created_at,
                    },
                )
            })
            .collect();
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn completed_tx(id: i32, amount: Decimal) -> Transaction {
        Transaction {
            id,
            member_id: 1,
            amount,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
            contents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn local_source_mirrors_completed_transactions() {
        let mut pending = completed_tx(2, dec!(50.00));
        pending.status = TransactionStatus::Pending;
        let txs = vec![completed_tx(1, dec!(115.00)), pending];

        let payments = LocalPaymentSource
            .completed_payments(Utc::now(), Utc::now(), &txs)
            .await
            .unwrap();

        assert_eq!(payments.len(), 1);
        let payment = &payments[&1];
        assert_eq!(payment.amount, dec!(115.00));
        assert_eq!(payment.fee, dec!(1.15));
    }
}
