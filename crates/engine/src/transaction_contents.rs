//! Per-product content rows of a transaction.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use crate::money;

/// One product line of a transaction, with its share of the total amount.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionContent {
    pub id: i32,
    pub product_id: i32,
    pub count: i32,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub transaction_id: i32,
    pub product_id: i32,
    pub count: i32,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transaction,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Product,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for TransactionContent {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            count: model.count,
            amount: money::from_minor(model.amount_minor),
        }
    }
}
