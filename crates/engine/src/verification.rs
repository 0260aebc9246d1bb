//! Groups allocated amounts into verifications.
//!
//! A verification is the accounting-document unit of the SIE format: all
//! rows for one `(period, account, cost center)` bucket. Ordering is an
//! explicit part of the contract because the consuming bookkeeping software
//! keys off document order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{Aggregation, AllocatedAmount};

/// One `#VER` block of the output file.
#[derive(Clone, Debug, PartialEq)]
pub struct Verification {
    /// Period bucket key, e.g. `2024-03` for monthly aggregation.
    pub period: String,
    /// First day of the period; used as the verification date.
    pub date: NaiveDate,
    pub account: i32,
    pub cost_center: String,
    pub rows: Vec<AllocatedAmount>,
}

impl Verification {
    /// Sum of the contributing rows.
    pub fn amount(&self) -> Decimal {
        self.rows.iter().map(|row| row.amount).sum()
    }
}

/// Buckets allocated amounts by `(period, account, cost center)`.
///
/// The result is sorted by exactly that tuple - period chronologically,
/// account ascending, cost center lexicographically - and rows inside a
/// verification by `(date, transaction id)`. The output is a pure function
/// of the grouping key, independent of input iteration order.
pub fn create_verifications(
    amounts: Vec<AllocatedAmount>,
    aggregation: Aggregation,
) -> Vec<Verification> {
    let mut buckets: BTreeMap<(String, i32, String), Vec<AllocatedAmount>> = BTreeMap::new();

    for amount in amounts {
        let period = aggregation.period_key(amount.date.date_naive());
        buckets
            .entry((period, amount.account, amount.cost_center.clone()))
            .or_default()
            .push(amount);
    }

    buckets
        .into_iter()
        .map(|((period, account, cost_center), mut rows)| {
            rows.sort_by_key(|row| (row.date, row.transaction_id, row.entry_type));
            let date = rows
                .first()
                .map(|row| aggregation.period_start(row.date.date_naive()))
                .unwrap_or_default();
            Verification {
                period,
                date,
                account,
                cost_center,
                rows,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccountingEntryType;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn row(
        transaction_id: i32,
        account: i32,
        cost_center: &str,
        amount: Decimal,
        date: (i32, u32, u32),
    ) -> AllocatedAmount {
        AllocatedAmount {
            transaction_id,
            account,
            cost_center: cost_center.to_string(),
            entry_type: AccountingEntryType::Credit,
            amount,
            date: Utc.with_ymd_and_hms(date.0, date.1, date.2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn groups_by_period_account_and_cost_center() {
        let rows = vec![
            row(1, 3001, "Verkstad", dec!(10.00), (2024, 1, 5)),
            row(2, 3001, "Verkstad", dec!(20.00), (2024, 1, 20)),
            row(3, 3001, "Verkstad", dec!(30.00), (2024, 2, 1)),
        ];

        let verifications = create_verifications(rows, Aggregation::Month);

        assert_eq!(verifications.len(), 2);
        assert_eq!(verifications[0].period, "2024-01");
        assert_eq!(verifications[0].amount(), dec!(30.00));
        assert_eq!(
            verifications[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(verifications[1].period, "2024-02");
    }

    #[test]
    fn ordering_is_independent_of_input_order() {
        let rows = vec![
            row(4, 6573, "Föreningsgemensamt", dec!(3.45), (2024, 2, 2)),
            row(1, 3001, "Verkstad", dec!(10.00), (2024, 1, 5)),
            row(3, 3001, "Kurser", dec!(5.00), (2024, 1, 7)),
            row(2, 3001, "Verkstad", dec!(20.00), (2024, 1, 9)),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let first = create_verifications(rows, Aggregation::Month);
        let second = create_verifications(reversed, Aggregation::Month);

        assert_eq!(first, second);
        let keys: Vec<_> = first
            .iter()
            .map(|v| (v.period.clone(), v.account, v.cost_center.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn accounts_sort_ascending_within_a_period() {
        let rows = vec![
            row(1, 6573, "Föreningsgemensamt", dec!(3.45), (2024, 1, 5)),
            row(1, 3001, "Verkstad", dec!(115.00), (2024, 1, 5)),
        ];

        let verifications = create_verifications(rows, Aggregation::Month);
        assert_eq!(verifications[0].account, 3001);
        assert_eq!(verifications[1].account, 6573);
    }

    #[test]
    fn yearly_aggregation_merges_months() {
        let rows = vec![
            row(1, 3001, "Verkstad", dec!(10.00), (2024, 1, 5)),
            row(2, 3001, "Verkstad", dec!(20.00), (2024, 6, 5)),
        ];

        let verifications = create_verifications(rows, Aggregation::Year);
        assert_eq!(verifications.len(), 1);
        assert_eq!(verifications[0].period, "2024");
        assert_eq!(verifications[0].amount(), dec!(30.00));
    }
}
