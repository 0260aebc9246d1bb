//! Currency amount helpers.
//!
//! The database stores amounts as **integer minor units** (öre); all
//! arithmetic in the engine happens on [`Decimal`] major units to avoid
//! floating-point drift.

use rust_decimal::Decimal;

/// Converts integer minor units (öre / cents) to a decimal major amount.
pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Formats an amount with exactly two decimals, the way SIE expects it.
///
/// Rounds half away from zero, matching bookkeeping convention.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(
        2,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    let mut out = rounded.to_string();
    match out.find('.') {
        None => out.push_str(".00"),
        Some(dot) => {
            let decimals = out.len() - dot - 1;
            for _ in decimals..2 {
                out.push('0');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn from_minor_scales_to_two_decimals() {
        assert_eq!(from_minor(11500), dec!(115.00));
        assert_eq!(from_minor(-345), dec!(-3.45));
    }

    #[test]
    fn format_amount_always_two_decimals() {
        assert_eq!(format_amount(dec!(115)), "115.00");
        assert_eq!(format_amount(dec!(3.4)), "3.40");
        assert_eq!(format_amount(dec!(-3.45)), "-3.45");
        assert_eq!(format_amount(dec!(0.005)), "0.01");
    }
}
