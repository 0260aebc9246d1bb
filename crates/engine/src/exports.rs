//! Persisted accounting export jobs.
//!
//! An `accounting_exports` row is created in `pending` state when an export
//! is requested and moves to exactly one terminal state: `completed` (with
//! the rendered SIE content) or `failed`. Terminal rows are never mutated
//! again; re-running a window creates a new row. Pending rows double as the
//! durable work queue consumed by the export worker.

use sea_orm::entity::prelude::*;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStatus {
    Pending,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for ExportStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid export status: {other}"
            ))),
        }
    }
}

/// Time granularity at which verifications are bucketed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Aggregation {
    Year,
    #[default]
    Month,
    Day,
}

impl Aggregation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
        }
    }

    /// The period bucket key for a date, e.g. `2024-03` for monthly grouping.
    ///
    /// Keys are zero-padded so their lexicographic order is chronological.
    pub fn period_key(self, date: chrono::NaiveDate) -> String {
        match self {
            Self::Year => date.format("%Y").to_string(),
            Self::Month => date.format("%Y-%m").to_string(),
            Self::Day => date.format("%Y-%m-%d").to_string(),
        }
    }

    /// The first day of the period bucket a date falls into.
    pub fn period_start(self, date: chrono::NaiveDate) -> chrono::NaiveDate {
        use chrono::Datelike;
        match self {
            Self::Year => chrono::NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
            Self::Month => {
                chrono::NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
            Self::Day => date,
        }
    }
}

impl TryFrom<&str> for Aggregation {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid aggregation: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounting_exports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub signer_member_id: i32,
    pub status: String,
    pub aggregation: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    /// The rendered SIE text; set only when the export completes.
    pub content: Option<String>,
    pub created_at: DateTimeUtc,
    /// When the row reached its terminal state, whether completed or failed.
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::SignerMemberId",
        to = "super::members::Column::Id"
    )]
    Signer,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn period_keys_follow_aggregation() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(Aggregation::Year.period_key(date), "2024");
        assert_eq!(Aggregation::Month.period_key(date), "2024-03");
        assert_eq!(Aggregation::Day.period_key(date), "2024-03-17");
    }

    #[test]
    fn period_start_truncates_to_bucket() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(
            Aggregation::Month.period_start(date),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            Aggregation::Year.period_start(date),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(Aggregation::Day.period_start(date), date);
    }
}
