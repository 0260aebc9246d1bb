//! Splits reconciled transactions across accounting dimensions.
//!
//! Each content line of a transaction is divided over the product's
//! configured `(account, cost center, fraction)` triples. Processor fees are
//! never split: they are one per-transaction charge unrelated to product mix
//! and go wholesale to the fixed fee account.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{CompletedPayment, EngineError, ProductToAccountCostCenter, Transaction};

/// Account for payment-processor fees.
pub const FEE_ACCOUNT: i32 = 6573;
/// Cost center for payment-processor fees.
pub const FEE_COST_CENTER: &str = "Föreningsgemensamt";

/// Double-entry side of an allocated amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountingEntryType {
    Debit,
    Credit,
}

impl AccountingEntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

/// One allocated amount: a transaction's contribution to an
/// (account, cost center) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocatedAmount {
    pub transaction_id: i32,
    pub account: i32,
    pub cost_center: String,
    pub entry_type: AccountingEntryType,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

/// A fraction set that does not sum to its content line's amount.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundingError {
    pub account: i32,
    pub expected: Decimal,
    pub actual: Decimal,
}

impl RoundingError {
    pub fn discrepancy(&self) -> Decimal {
        self.expected - self.actual
    }
}

/// Accumulator for one transaction's allocated amounts.
///
/// Amounts added for the same `(account, cost center, entry type)` key are
/// summed; `finalize` yields the rows in key order.
#[derive(Debug)]
pub struct AmountAccumulator {
    transaction_id: i32,
    date: DateTime<Utc>,
    amounts: BTreeMap<(i32, String, AccountingEntryType), Decimal>,
}

impl AmountAccumulator {
    pub fn new(transaction_id: i32, date: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            date,
            amounts: BTreeMap::new(),
        }
    }

    pub fn add(
        &mut self,
        account: i32,
        cost_center: &str,
        entry_type: AccountingEntryType,
        amount: Decimal,
    ) {
        *self
            .amounts
            .entry((account, cost_center.to_string(), entry_type))
            .or_insert(Decimal::ZERO) += amount;
    }

    pub fn finalize(self) -> Vec<AllocatedAmount> {
        self.amounts
            .into_iter()
            .map(|((account, cost_center, entry_type), amount)| AllocatedAmount {
                transaction_id: self.transaction_id,
                account,
                cost_center,
                entry_type,
                amount,
                date: self.date,
            })
            .collect()
    }
}

/// Allocates every reconciled transaction over its products' accounting
/// dimensions and the fee account.
///
/// Returns the allocated rows plus any rounding leftovers; the caller
/// decides whether a non-empty rounding list is fatal. A product without
/// allocation rules is a configuration error.
pub fn split_transactions(
    index: &ProductToAccountCostCenter,
    transactions: &[Transaction],
    payments: &HashMap<i32, CompletedPayment>,
) -> Result<(Vec<AllocatedAmount>, Vec<RoundingError>), EngineError> {
    let mut allocated = Vec::new();
    let mut rounding_errors = Vec::new();

    for tx in transactions {
        let mut accumulator = AmountAccumulator::new(tx.id, tx.created_at);

        for content in &tx.contents {
            let rules = index.get(content.product_id).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "product {} has no allocation rules",
                    content.product_id
                ))
            })?;

            let mut added = Decimal::ZERO;
            for rule in rules {
                let amount_to_add = rule.fraction * content.amount;
                accumulator.add(
                    rule.account,
                    &rule.cost_center,
                    AccountingEntryType::Credit,
                    amount_to_add,
                );
                added += amount_to_add;
            }

            if added != content.amount {
                rounding_errors.push(RoundingError {
                    account: rules.first().map(|rule| rule.account).unwrap_or_default(),
                    expected: content.amount,
                    actual: added,
                });
            }
        }

        if let Some(payment) = payments.get(&tx.id)
            && !payment.fee.is_zero()
        {
            accumulator.add(
                FEE_ACCOUNT,
                FEE_COST_CENTER,
                AccountingEntryType::Debit,
                payment.fee,
            );
        }

        allocated.extend(accumulator.finalize());
    }

    Ok((allocated, rounding_errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountCostCenter, TransactionContent, TransactionStatus};
    use rust_decimal_macros::dec;

    fn tx_with_contents(id: i32, contents: Vec<TransactionContent>) -> Transaction {
        let amount = contents.iter().map(|c| c.amount).sum();
        Transaction {
            id,
            member_id: 1,
            amount,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
            contents,
        }
    }

    fn content(product_id: i32, amount: Decimal) -> TransactionContent {
        TransactionContent {
            id: product_id,
            product_id,
            count: 1,
            amount,
        }
    }

    fn rule(account: i32, cost_center: &str, fraction: Decimal) -> AccountCostCenter {
        AccountCostCenter {
            account,
            cost_center: cost_center.to_string(),
            fraction,
        }
    }

    fn index_for(product_id: i32, rules: Vec<AccountCostCenter>) -> ProductToAccountCostCenter {
        let mut index = ProductToAccountCostCenter::default();
        for r in rules {
            index.insert(product_id, r);
        }
        index
    }

    #[test]
    fn fractions_summing_to_one_conserve_the_amount() {
        let index = index_for(
            10,
            vec![
                rule(3001, "Verkstad", dec!(0.4)),
                rule(3002, "Kurser", dec!(0.6)),
            ],
        );
        let tx = tx_with_contents(1, vec![content(10, dec!(115.00))]);

        let (allocated, rounding) =
            split_transactions(&index, &[tx], &HashMap::new()).unwrap();

        assert!(rounding.is_empty());
        let total: Decimal = allocated.iter().map(|a| a.amount).sum();
        assert_eq!(total, dec!(115.00));
        assert_eq!(allocated.len(), 2);
        assert!(allocated
            .iter()
            .all(|a| a.entry_type == AccountingEntryType::Credit));
    }

    #[test]
    fn broken_fraction_set_reports_the_leftover() {
        let index = index_for(10, vec![rule(3001, "Verkstad", dec!(0.999999))]);
        let tx = tx_with_contents(1, vec![content(10, dec!(100.00))]);

        let (_, rounding) = split_transactions(&index, &[tx], &HashMap::new()).unwrap();

        assert_eq!(rounding.len(), 1);
        assert_eq!(rounding[0].account, 3001);
        assert_eq!(rounding[0].discrepancy(), dec!(100.00) * dec!(0.000001));
    }

    #[test]
    fn same_account_pair_accumulates_within_a_transaction() {
        let mut index = index_for(10, vec![rule(3001, "Verkstad", dec!(1.0))]);
        index.insert(11, rule(3001, "Verkstad", dec!(1.0)));
        let tx = tx_with_contents(
            1,
            vec![content(10, dec!(40.00)), content(11, dec!(60.00))],
        );

        let (allocated, rounding) =
            split_transactions(&index, &[tx], &HashMap::new()).unwrap();

        assert!(rounding.is_empty());
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].amount, dec!(100.00));
    }

    #[test]
    fn fee_goes_wholesale_to_the_fee_account() {
        let index = index_for(10, vec![rule(3001, "Verkstad", dec!(1.0))]);
        let tx = tx_with_contents(42, vec![content(10, dec!(115.00))]);
        let payments = HashMap::from([(
            42,
            CompletedPayment {
                transaction_id: 42,
                amount: dec!(115.00),
                fee: dec!(3.45),
                charge_created: Utc::now(),
            },
        )]);

        let (allocated, _) = split_transactions(&index, &[tx], &payments).unwrap();

        let fee_row = allocated
            .iter()
            .find(|a| a.account == FEE_ACCOUNT)
            .expect("fee row missing");
        assert_eq!(fee_row.amount, dec!(3.45));
        assert_eq!(fee_row.cost_center, FEE_COST_CENTER);
        assert_eq!(fee_row.entry_type, AccountingEntryType::Debit);
    }

    #[test]
    fn unmapped_product_is_a_configuration_error() {
        let index = ProductToAccountCostCenter::default();
        let tx = tx_with_contents(1, vec![content(99, dec!(10.00))]);

        let err = split_transactions(&index, &[tx], &HashMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
