//! Reconciliation of the internal ledger against the processor's payments.
//!
//! Every completed transaction must have exactly one settled payment with
//! the same id and the same amount. Anything else is a mismatch, and a
//! single mismatch aborts the export: an accounting file must never under-
//! or over-report revenue.

use std::collections::HashMap;

use crate::{CompletedPayment, Transaction, TransactionStatus};

/// One divergence between the ledger and the payment set.
///
/// `transaction` is `None` for payments with no local counterpart;
/// `payment` is `None` for completed transactions the processor never
/// settled.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    pub transaction: Option<Transaction>,
    pub payment: Option<CompletedPayment>,
}

/// Diffs completed transactions against settled payments.
///
/// Matched payments are popped from `payments`; whatever remains afterwards
/// has no local transaction and is reported too. An empty result is a clean
/// reconciliation.
pub fn diff(
    transactions: &[Transaction],
    payments: &mut HashMap<i32, CompletedPayment>,
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for tx in transactions {
        if tx.status != TransactionStatus::Completed {
            continue;
        }
        match payments.remove(&tx.id) {
            None => mismatches.push(Mismatch {
                transaction: Some(tx.clone()),
                payment: None,
            }),
            Some(payment) if payment.amount != tx.amount => mismatches.push(Mismatch {
                transaction: Some(tx.clone()),
                payment: Some(payment),
            }),
            Some(_) => {}
        }
    }

    // Leftover payments have no matching transaction. Drain them in id order
    // so the report is stable run-to-run.
    let mut orphans: Vec<CompletedPayment> = payments.drain().map(|(_, p)| p).collect();
    orphans.sort_by_key(|payment| payment.transaction_id);
    mismatches.extend(orphans.into_iter().map(|payment| Mismatch {
        transaction: None,
        payment: Some(payment),
    }));

    mismatches
}
