use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use super::{Engine, with_tx};
use crate::{
    AccountCostCenter, EngineError, ProductToAccountCostCenter, ResultEngine, accounts,
    allocation_rules, cost_centers, products,
};

impl Engine {
    /// Builds the `product -> allocation rules` index from reference data.
    ///
    /// Rebuilt for every export run so a long-lived worker never serves a
    /// stale allocation configuration. Dangling account or cost-center
    /// references are configuration errors, not skippable rows.
    pub async fn product_account_index(&self) -> ResultEngine<ProductToAccountCostCenter> {
        let account_numbers: HashMap<i32, i32> = accounts::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(|account| (account.id, account.account))
            .collect();
        let cost_center_names: HashMap<i32, String> = cost_centers::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(|cc| (cc.id, cc.cost_center))
            .collect();

        let mut index = ProductToAccountCostCenter::default();
        for rule in allocation_rules::Entity::find().all(&self.database).await? {
            let account = *account_numbers.get(&rule.account_id).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "allocation rule {} references missing account {}",
                    rule.id, rule.account_id
                ))
            })?;
            let cost_center = cost_center_names
                .get(&rule.cost_center_id)
                .ok_or_else(|| {
                    EngineError::Configuration(format!(
                        "allocation rule {} references missing cost center {}",
                        rule.id, rule.cost_center_id
                    ))
                })?
                .clone();
            let fraction = rule.parse_fraction()?;

            index.insert(
                rule.product_id,
                AccountCostCenter {
                    account,
                    cost_center,
                    fraction,
                },
            );
        }
        Ok(index)
    }

    /// Adds an allocation rule for a product, creating the account and
    /// cost-center reference rows when they do not exist yet.
    pub async fn add_allocation_rule(
        &self,
        product_id: i32,
        account: i32,
        cost_center: &str,
        fraction: Decimal,
    ) -> ResultEngine<allocation_rules::Model> {
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(EngineError::InvalidRequest(format!(
                "fraction must be in (0, 1], got {fraction}"
            )));
        }
        let cost_center = cost_center.trim();
        if cost_center.is_empty() {
            return Err(EngineError::InvalidRequest(
                "cost center must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            products::Entity::find_by_id(product_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("product {product_id}")))?;

            let account_id = match accounts::Entity::find()
                .filter(accounts::Column::Account.eq(account))
                .one(&db_tx)
                .await?
            {
                Some(existing) => existing.id,
                None => {
                    let created = accounts::ActiveModel {
                        account: ActiveValue::Set(account),
                        description: ActiveValue::Set(String::new()),
                        ..Default::default()
                    }
                    .insert(&db_tx)
                    .await?;
                    created.id
                }
            };

            let cost_center_id = match cost_centers::Entity::find()
                .filter(cost_centers::Column::CostCenter.eq(cost_center))
                .one(&db_tx)
                .await?
            {
                Some(existing) => existing.id,
                None => {
                    let created = cost_centers::ActiveModel {
                        cost_center: ActiveValue::Set(cost_center.to_string()),
                        description: ActiveValue::Set(String::new()),
                        ..Default::default()
                    }
                    .insert(&db_tx)
                    .await?;
                    created.id
                }
            };

            let rule = allocation_rules::ActiveModel {
                product_id: ActiveValue::Set(product_id),
                account_id: ActiveValue::Set(account_id),
                cost_center_id: ActiveValue::Set(cost_center_id),
                fraction: ActiveValue::Set(fraction.to_string()),
                ..Default::default()
            }
            .insert(&db_tx)
            .await?;
            Ok(rule)
        })
    }
}
