use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};

use super::Engine;
use crate::{
    Aggregation, EngineError, ExportStatus, PaymentSource, ResultEngine, allocation, exports,
    reconcile, sie, verification,
};

impl Engine {
    /// Queues an export of one calendar month.
    ///
    /// The row is inserted in `pending` state; the worker picks it up later.
    /// Re-requesting an already exported month is allowed and creates a new
    /// row.
    pub async fn request_export(
        &self,
        year: i32,
        month: u32,
        signer_member_id: i32,
    ) -> ResultEngine<exports::Model> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EngineError::InvalidRequest(format!("invalid export month {year}-{month}"))
        })?;
        let end = match month {
            12 => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            _ => NaiveDate::from_ymd_opt(year, month + 1, 1),
        }
        .ok_or_else(|| {
            EngineError::InvalidRequest(format!("invalid export month {year}-{month}"))
        })?;

        let signer = self.member(signer_member_id).await?;

        let export = exports::ActiveModel {
            signer_member_id: ActiveValue::Set(signer.id),
            status: ActiveValue::Set(ExportStatus::Pending.as_str().to_string()),
            aggregation: ActiveValue::Set(self.aggregation.as_str().to_string()),
            start_date: ActiveValue::Set(start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()),
            end_date: ActiveValue::Set(end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()),
            content: ActiveValue::Set(None),
            created_at: ActiveValue::Set(Utc::now()),
            completed_at: ActiveValue::Set(None),
            ..Default::default()
        };
        let export = export.insert(&self.database).await?;
        tracing::info!(export_id = export.id, %start, "export queued");
        Ok(export)
    }

    /// All export jobs, newest first.
    pub async fn list_exports(&self) -> ResultEngine<Vec<exports::Model>> {
        let exports = exports::Entity::find()
            .order_by_desc(exports::Column::Id)
            .all(&self.database)
            .await?;
        Ok(exports)
    }

    pub async fn export(&self, id: i32) -> ResultEngine<exports::Model> {
        exports::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("export {id}")))
    }

    /// The rendered SIE file of a completed export, transcoded to code
    /// page 437.
    pub async fn export_content(&self, id: i32) -> ResultEngine<Vec<u8>> {
        let export = self.export(id).await?;
        let content = export.content.as_deref().ok_or_else(|| {
            EngineError::InvalidRequest(format!("export {id} has no content yet"))
        })?;
        sie::encode_cp437(content)
    }

    /// Claims and processes the oldest pending export, if any.
    ///
    /// Returns the processed export id, or `None` when the queue is empty.
    /// The job always reaches a terminal state: a failed run marks the row
    /// `failed` instead of bubbling the error to the worker loop.
    pub async fn process_next_pending(
        &self,
        source: &dyn PaymentSource,
    ) -> ResultEngine<Option<i32>> {
        let Some(export) = exports::Entity::find()
            .filter(exports::Column::Status.eq(ExportStatus::Pending.as_str()))
            .order_by_asc(exports::Column::CreatedAt)
            .order_by_asc(exports::Column::Id)
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };

        match self.run_export(&export, source).await {
            Ok(content) => {
                tracing::info!(export_id = export.id, "export completed");
                self.finish_export(export.id, ExportStatus::Completed, Some(content))
                    .await?;
            }
            Err(err) => {
                tracing::error!(export_id = export.id, error = %err, "export failed");
                self.finish_export(export.id, ExportStatus::Failed, None)
                    .await?;
            }
        }
        Ok(Some(export.id))
    }

    /// Moves a pending export to a terminal state and stamps `completed_at`
    /// with the transition time, for failed rows as well.
    ///
    /// The update is guarded on the current status so a row can never leave
    /// a terminal state again.
    async fn finish_export(
        &self,
        id: i32,
        status: ExportStatus,
        content: Option<String>,
    ) -> ResultEngine<()> {
        exports::Entity::update_many()
            .col_expr(exports::Column::Status, Expr::value(status.as_str()))
            .col_expr(exports::Column::Content, Expr::value(content))
            .col_expr(exports::Column::CompletedAt, Expr::value(Some(Utc::now())))
            .filter(exports::Column::Id.eq(id))
            .filter(exports::Column::Status.eq(ExportStatus::Pending.as_str()))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Runs the full pipeline for one export: fetch, reconcile, allocate,
    /// group, render.
    async fn run_export(
        &self,
        export: &exports::Model,
        source: &dyn PaymentSource,
    ) -> ResultEngine<String> {
        let signer = self.find_signer(export.signer_member_id).await?;
        let aggregation = Aggregation::try_from(export.aggregation.as_str())?;

        let transactions = self
            .completed_transactions(export.start_date, export.end_date)
            .await?;
        let index = self.product_account_index().await?;
        let payments = source
            .completed_payments(export.start_date, export.end_date, &transactions)
            .await?;

        // diff consumes its map; keep the original around for fee lookups.
        let mut unmatched = payments.clone();
        let mismatches = reconcile::diff(&transactions, &mut unmatched);
        if !mismatches.is_empty() {
            for mismatch in &mismatches {
                tracing::error!(
                    transaction_id = mismatch.transaction.as_ref().map(|t| t.id),
                    payment_transaction_id = mismatch.payment.as_ref().map(|p| p.transaction_id),
                    "reconciliation mismatch"
                );
            }
            return Err(EngineError::Integrity(format!(
                "{} reconciliation mismatch(es) between ledger and payment processor",
                mismatches.len()
            )));
        }

        let (allocated, rounding_errors) =
            allocation::split_transactions(&index, &transactions, &payments)?;
        if !rounding_errors.is_empty() {
            for error in &rounding_errors {
                tracing::error!(
                    account = error.account,
                    discrepancy = %error.discrepancy(),
                    "allocation rounding error"
                );
            }
            return Err(EngineError::Integrity(format!(
                "{} allocation rounding error(s); fractions do not sum to 1",
                rounding_errors.len()
            )));
        }

        let verifications = verification::create_verifications(allocated, aggregation);
        Ok(sie::render(
            &self.sie,
            &verifications,
            export.start_date.date_naive(),
            &signer.display_name(),
            Utc::now().date_naive(),
        ))
    }
}
