use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, prelude::*};

use super::Engine;
use crate::{
    ResultEngine, Transaction, TransactionStatus, transaction_contents, transactions,
};

impl Engine {
    /// Loads completed transactions in `[start, end)` with their contents,
    /// ordered by id.
    pub async fn completed_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed.as_str()))
            .filter(transactions::Column::CreatedAt.gte(start))
            .filter(transactions::Column::CreatedAt.lt(end))
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;

        let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
        let content_models = transaction_contents::Entity::find()
            .filter(transaction_contents::Column::TransactionId.is_in(ids))
            .order_by_asc(transaction_contents::Column::Id)
            .all(&self.database)
            .await?;

        let mut contents_by_tx: HashMap<i32, Vec<transaction_contents::Model>> = HashMap::new();
        for content in content_models {
            contents_by_tx
                .entry(content.transaction_id)
                .or_default()
                .push(content);
        }

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let contents = contents_by_tx.remove(&model.id).unwrap_or_default();
            out.push(Transaction::try_from(model)?.with_contents(contents));
        }
        Ok(out)
    }
}
