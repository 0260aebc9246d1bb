//! Webshop products, referenced by transaction contents and allocation rules.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_contents::Entity")]
    TransactionContents,
    #[sea_orm(has_many = "super::allocation_rules::Entity")]
    AllocationRules,
}

impl Related<super::transaction_contents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionContents.def()
    }
}

impl Related<super::allocation_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AllocationRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
