//! SIE type 4 serialization.
//!
//! Renders verifications to the SIE text format consumed by Swedish
//! bookkeeping software. The file layout is rigid: a fixed header block,
//! one blank line, then one `#VER` block per verification with a `#TRANS`
//! row per allocated amount. SIE mandates IBM code page 437, so the
//! rendered string is transcoded at the output boundary.

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate};
use codepage_437::{CP437_CONTROL, ToCp437};
use rust_decimal::Decimal;

use crate::money;
use crate::{AccountingEntryType, EngineError, Verification};

/// Identity fields written into the SIE header.
#[derive(Clone, Debug)]
pub struct SieSettings {
    pub program: String,
    pub program_version: String,
    pub org_number: String,
    pub org_name: String,
    pub currency: String,
    /// Verification series letter.
    pub series: String,
}

impl Default for SieSettings {
    fn default() -> Self {
        Self {
            program: "verkstad".to_string(),
            program_version: env!("CARGO_PKG_VERSION").to_string(),
            org_number: String::new(),
            org_name: String::new(),
            currency: "SEK".to_string(),
            series: "A".to_string(),
        }
    }
}

/// Renders a complete SIE type 4 document.
///
/// Verification numbers are assigned 1-based in input order, so callers
/// must pass verifications already sorted; [`crate::create_verifications`]
/// guarantees that. `start` anchors the financial year: `#RAR` always
/// covers the calendar year of `start`.
pub fn render(
    settings: &SieSettings,
    verifications: &[Verification],
    start: NaiveDate,
    signer: &str,
    generated_on: NaiveDate,
) -> String {
    let mut lines = header(settings, start, signer, generated_on);
    lines.push(String::new());

    for (verification, number) in verifications.iter().zip(1..) {
        lines.extend(render_verification(settings, verification, number));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn header(
    settings: &SieSettings,
    start: NaiveDate,
    signer: &str,
    generated_on: NaiveDate,
) -> Vec<String> {
    let year_start = NaiveDate::from_ymd_opt(start.year(), 1, 1).unwrap_or(start);
    let year_end = NaiveDate::from_ymd_opt(start.year(), 12, 31).unwrap_or(start);

    vec![
        "#FLAGGA 0".to_string(),
        format!(
            "#PROGRAM \"{}\" {}",
            settings.program, settings.program_version
        ),
        "#FORMAT PC8".to_string(),
        format!("#GEN {} \"{}\"", sie_date(generated_on), signer),
        "#SIETYP 4".to_string(),
        format!("#ORGNR {}", settings.org_number),
        format!("#FNAMN \"{}\"", settings.org_name),
        format!("#RAR 0 {} {}", sie_date(year_start), sie_date(year_end)),
        "#KPTYP EUBAS97".to_string(),
        format!("#VALUTA {}", settings.currency),
    ]
}

fn render_verification(
    settings: &SieSettings,
    verification: &Verification,
    number: u32,
) -> Vec<String> {
    let mut lines = vec![format!(
        "#VER {} {} {} \"{} / {} {}\"",
        settings.series,
        number,
        sie_date(verification.date),
        verification.account,
        verification.cost_center,
        verification.period,
    )];
    lines.push("{".to_string());
    for row in &verification.rows {
        lines.push(format!(
            "#TRANS {} {{\"1\" \"{}\"}} {} {} \"id {}\"",
            row.account,
            row.cost_center,
            money::format_amount(signed_amount(row.entry_type, row.amount)),
            sie_date(row.date.date_naive()),
            row.transaction_id,
        ));
    }
    lines.push("}".to_string());
    lines
}

// SIE books revenue as credit; debits carry the opposite sign.
fn signed_amount(entry_type: AccountingEntryType, amount: Decimal) -> Decimal {
    match entry_type {
        AccountingEntryType::Credit => amount,
        AccountingEntryType::Debit => -amount,
    }
}

fn sie_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Transcodes rendered SIE text to code page 437.
///
/// Swedish account and cost-center names (å, ä, ö) are all representable;
/// anything outside the code page means bad reference data.
pub fn encode_cp437(content: &str) -> Result<Vec<u8>, EngineError> {
    match content.to_cp437(&CP437_CONTROL) {
        Ok(Cow::Borrowed(bytes)) => Ok(bytes.to_vec()),
        Ok(Cow::Owned(bytes)) => Ok(bytes),
        Err(err) => Err(EngineError::Integrity(format!(
            "export content is not representable in code page 437 at byte {}",
            err.representable_up_to
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AllocatedAmount;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn settings() -> SieSettings {
        SieSettings {
            program: "verkstad".to_string(),
            program_version: "1.0".to_string(),
            org_number: "802400-1234".to_string(),
            org_name: "Verkstadsföreningen".to_string(),
            currency: "SEK".to_string(),
            series: "A".to_string(),
        }
    }

    fn verification(account: i32, cost_center: &str, rows: Vec<AllocatedAmount>) -> Verification {
        Verification {
            period: "2024-01".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            account,
            cost_center: cost_center.to_string(),
            rows,
        }
    }

    fn row(entry_type: AccountingEntryType, amount: Decimal) -> AllocatedAmount {
        AllocatedAmount {
            transaction_id: 42,
            account: 3001,
            cost_center: "Verkstad".to_string(),
            entry_type,
            amount,
            date: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn header_covers_the_calendar_year_of_the_window() {
        let out = render(
            &settings(),
            &[],
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Anna Andersson",
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
        );

        assert!(out.starts_with("#FLAGGA 0\n"));
        assert!(out.contains("#PROGRAM \"verkstad\" 1.0\n"));
        assert!(out.contains("#FORMAT PC8\n"));
        assert!(out.contains("#GEN 20240402 \"Anna Andersson\"\n"));
        assert!(out.contains("#SIETYP 4\n"));
        assert!(out.contains("#RAR 0 20240101 20241231\n"));
        assert!(out.contains("#KPTYP EUBAS97\n"));
        assert!(out.contains("#VALUTA SEK\n"));
    }

    #[test]
    fn verifications_are_numbered_sequentially() {
        let verifications = vec![
            verification(3001, "Verkstad", vec![row(AccountingEntryType::Credit, dec!(115.00))]),
            verification(6573, "Föreningsgemensamt", vec![row(AccountingEntryType::Debit, dec!(3.45))]),
        ];

        let out = render(
            &settings(),
            &verifications,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Anna Andersson",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );

        assert!(out.contains("#VER A 1 20240101"));
        assert!(out.contains("#VER A 2 20240101"));
    }

    #[test]
    fn debits_render_with_the_opposite_sign() {
        let verifications = vec![verification(
            6573,
            "Föreningsgemensamt",
            vec![row(AccountingEntryType::Debit, dec!(3.45))],
        )];

        let out = render(
            &settings(),
            &verifications,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Anna Andersson",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );

        assert!(out.contains("#TRANS 3001 {\"1\" \"Verkstad\"} -3.45 20240115 \"id 42\""));
    }

    #[test]
    fn credits_render_unsigned() {
        let verifications = vec![verification(
            3001,
            "Verkstad",
            vec![row(AccountingEntryType::Credit, dec!(115.00))],
        )];

        let out = render(
            &settings(),
            &verifications,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Anna Andersson",
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );

        assert!(out.contains("#TRANS 3001 {\"1\" \"Verkstad\"} 115.00 20240115 \"id 42\""));
    }

    #[test]
    fn swedish_letters_survive_transcoding() {
        let bytes = encode_cp437("#FNAMN \"Föreningsgemensamt åäö\"").unwrap();
        // ö is 0x94 in code page 437.
        assert!(bytes.contains(&0x94));
        assert!(!bytes.is_empty());
    }

    #[test]
    fn unrepresentable_characters_are_rejected() {
        assert!(encode_cp437("snowman \u{2603}").is_err());
    }
}
