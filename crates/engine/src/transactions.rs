//! The internal transaction ledger.
//!
//! A `Transaction` is one webshop purchase. Completed transactions are
//! immutable and carry an ordered list of [`TransactionContent`] rows whose
//! amounts sum to the transaction amount.
//!
//! [`TransactionContent`]: super::TransactionContent

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use crate::{EngineError, money, transaction_contents};

pub use crate::transaction_contents::TransactionContent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// A ledger transaction with its content rows loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: i32,
    pub member_id: i32,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub contents: Vec<TransactionContent>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub member_id: i32,
    pub amount_minor: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_contents::Entity")]
    Contents,
    #[sea_orm(
        belongs_to = "super::members::Entity",
        from = "Column::MemberId",
        to = "super::members::Column::Id"
    )]
    Member,
}

impl Related<super::transaction_contents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contents.def()
    }
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            member_id: model.member_id,
            amount: money::from_minor(model.amount_minor),
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            contents: Vec::new(),
        })
    }
}

impl Transaction {
    /// Attaches content rows, keeping their database order.
    pub fn with_contents(
        mut self,
        contents: Vec<transaction_contents::Model>,
    ) -> Self {
        self.contents = contents.into_iter().map(TransactionContent::from).collect();
        self
    }
}
