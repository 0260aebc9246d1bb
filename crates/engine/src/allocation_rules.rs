//! Per-product revenue allocation rules.
//!
//! Each rule says "this fraction of a product's revenue belongs to this
//! (account, cost center) pair". The fractions of one product are expected
//! to sum to 1.0; the allocation engine reports the leftover as a rounding
//! error when they do not.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use crate::EngineError;

/// One resolved allocation triple for a product.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountCostCenter {
    pub account: i32,
    pub cost_center: String,
    pub fraction: Decimal,
}

/// Read-only `product_id -> allocation rules` index.
///
/// Built once per export run and never mutated afterwards, so a long-lived
/// process cannot serve stale configuration and tests can construct it from
/// fixture data directly.
#[derive(Clone, Debug, Default)]
pub struct ProductToAccountCostCenter {
    rules: HashMap<i32, Vec<AccountCostCenter>>,
}

impl ProductToAccountCostCenter {
    pub fn new(rules: HashMap<i32, Vec<AccountCostCenter>>) -> Self {
        Self { rules }
    }

    pub fn get(&self, product_id: i32) -> Option<&[AccountCostCenter]> {
        self.rules.get(&product_id).map(Vec::as_slice)
    }

    pub fn insert(&mut self, product_id: i32, rule: AccountCostCenter) {
        self.rules.entry(product_id).or_default().push(rule);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_accounts_cost_centers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub account_id: i32,
    pub cost_center_id: i32,
    /// Decimal fraction in [0, 1], stored as text to avoid float drift.
    pub fraction: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::cost_centers::Entity",
        from = "Column::CostCenterId",
        to = "super::cost_centers::Column::Id"
    )]
    CostCenter,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::cost_centers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostCenter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn parse_fraction(&self) -> Result<Decimal, EngineError> {
        self.fraction.parse::<Decimal>().map_err(|_| {
            EngineError::Configuration(format!(
                "allocation rule {} has invalid fraction \"{}\"",
                self.id, self.fraction
            ))
        })
    }
}
