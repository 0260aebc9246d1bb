use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveValue, Database, DatabaseConnection, prelude::*};

use engine::{
    CompletedPayment, Engine, EngineError, ExportStatus, LocalPaymentSource, PaymentSource,
    SieSettings, Transaction, TransactionStatus, products, transaction_contents, transactions,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .sie(SieSettings {
            program: "verkstad".to_string(),
            program_version: "1.0".to_string(),
            org_number: "802400-1234".to_string(),
            org_name: "Verkstadsföreningen".to_string(),
            currency: "SEK".to_string(),
            series: "A".to_string(),
        })
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn seed_signer(engine: &Engine) -> i32 {
    engine
        .create_member("anna", "hash", "Anna", "Andersson", true)
        .await
        .unwrap()
        .id
}

async fn seed_product_with_rule(engine: &Engine, db: &DatabaseConnection) -> i32 {
    let product = products::ActiveModel {
        name: ActiveValue::Set("Medlemskap".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    engine
        .add_allocation_rule(product.id, 3001, "Verkstad", dec!(1.0))
        .await
        .unwrap();
    product.id
}

async fn seed_transaction(
    db: &DatabaseConnection,
    id: i32,
    member_id: i32,
    product_id: i32,
    amount_minor: i64,
    created_at: DateTime<Utc>,
) {
    transactions::ActiveModel {
        id: ActiveValue::Set(id),
        member_id: ActiveValue::Set(member_id),
        amount_minor: ActiveValue::Set(amount_minor),
        status: ActiveValue::Set(TransactionStatus::Completed.as_str().to_string()),
        created_at: ActiveValue::Set(created_at),
    }
    .insert(db)
    .await
    .unwrap();
    transaction_contents::ActiveModel {
        transaction_id: ActiveValue::Set(id),
        product_id: ActiveValue::Set(product_id),
        count: ActiveValue::Set(1),
        amount_minor: ActiveValue::Set(amount_minor),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

/// Payment source returning a fixed payment set, standing in for the real
/// processor.
struct FixedPayments(HashMap<i32, CompletedPayment>);

#[async_trait]
impl PaymentSource for FixedPayments {
    async fn completed_payments(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _transactions: &[Transaction],
    ) -> Result<HashMap<i32, CompletedPayment>, EngineError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn export_runs_end_to_end() {
    let (engine, db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;
    let product_id = seed_product_with_rule(&engine, &db).await;
    let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    seed_transaction(&db, 42, signer_id, product_id, 11500, created_at).await;

    let source = FixedPayments(HashMap::from([(
        42,
        CompletedPayment {
            transaction_id: 42,
            amount: dec!(115.00),
            fee: dec!(3.45),
            charge_created: created_at,
        },
    )]));

    let export = engine.request_export(2024, 1, signer_id).await.unwrap();
    let processed = engine.process_next_pending(&source).await.unwrap();
    assert_eq!(processed, Some(export.id));

    let export = engine.export(export.id).await.unwrap();
    assert_eq!(export.status, ExportStatus::Completed.as_str());
    assert!(export.completed_at.is_some());

    let content = export.content.as_deref().unwrap();
    assert!(content.contains("#RAR 0 20240101 20241231"));
    assert!(content.contains("\"Anna Andersson\""));
    // Revenue and fee land in separate verifications, one per account.
    assert_eq!(content.matches("#VER ").count(), 2);
    assert!(content.contains("#VER A 1 20240101"));
    assert!(content.contains("#VER A 2 20240101"));
    assert!(content.contains("#TRANS 3001 {\"1\" \"Verkstad\"} 115.00 20240115 \"id 42\""));
    assert!(content.contains(
        "#TRANS 6573 {\"1\" \"Föreningsgemensamt\"} -3.45 20240115 \"id 42\""
    ));
}

#[tokio::test]
async fn export_content_is_code_page_437() {
    let (engine, db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;
    let product_id = seed_product_with_rule(&engine, &db).await;
    let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    seed_transaction(&db, 1, signer_id, product_id, 10000, created_at).await;

    let export = engine.request_export(2024, 1, signer_id).await.unwrap();
    engine.process_next_pending(&LocalPaymentSource).await.unwrap();

    let bytes = engine.export_content(export.id).await.unwrap();
    // ö of "Föreningsgemensamt" is 0x94 in code page 437.
    assert!(bytes.contains(&0x94));
    assert!(!bytes.contains(&0xc3));
}

#[tokio::test]
async fn reconciliation_mismatch_marks_export_failed() {
    let (engine, db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;
    let product_id = seed_product_with_rule(&engine, &db).await;
    let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    seed_transaction(&db, 1, signer_id, product_id, 10000, created_at).await;

    // The processor saw nothing for this month.
    let source = FixedPayments(HashMap::new());

    let export = engine.request_export(2024, 1, signer_id).await.unwrap();
    let processed = engine.process_next_pending(&source).await.unwrap();
    assert_eq!(processed, Some(export.id));

    let export = engine.export(export.id).await.unwrap();
    assert_eq!(export.status, ExportStatus::Failed.as_str());
    assert!(export.content.is_none());
    assert!(export.completed_at.is_some());

    let err = engine.export_content(export.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn transactions_outside_the_window_are_ignored() {
    let (engine, db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;
    let product_id = seed_product_with_rule(&engine, &db).await;
    let january = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
    let february = Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap();
    seed_transaction(&db, 1, signer_id, product_id, 10000, january).await;
    seed_transaction(&db, 2, signer_id, product_id, 20000, february).await;

    let export = engine.request_export(2024, 1, signer_id).await.unwrap();
    engine.process_next_pending(&LocalPaymentSource).await.unwrap();

    let export = engine.export(export.id).await.unwrap();
    let content = export.content.as_deref().unwrap();
    assert!(content.contains("\"id 1\""));
    assert!(!content.contains("\"id 2\""));
}

#[tokio::test]
async fn request_export_rejects_invalid_month() {
    let (engine, _db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;

    let err = engine.request_export(2024, 13, signer_id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn request_export_requires_an_existing_signer() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.request_export(2024, 1, 999).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn empty_queue_processes_nothing() {
    let (engine, _db) = engine_with_db().await;
    assert_eq!(
        engine.process_next_pending(&LocalPaymentSource).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn pending_exports_are_processed_oldest_first() {
    let (engine, db) = engine_with_db().await;
    let signer_id = seed_signer(&engine).await;
    let product_id = seed_product_with_rule(&engine, &db).await;
    seed_transaction(
        &db,
        1,
        signer_id,
        product_id,
        10000,
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    )
    .await;

    let first = engine.request_export(2024, 1, signer_id).await.unwrap();
    let second = engine.request_export(2024, 2, signer_id).await.unwrap();

    assert_eq!(
        engine.process_next_pending(&LocalPaymentSource).await.unwrap(),
        Some(first.id)
    );
    assert_eq!(
        engine.process_next_pending(&LocalPaymentSource).await.unwrap(),
        Some(second.id)
    );

    let exports = engine.list_exports().await.unwrap();
    assert_eq!(exports.len(), 2);
    assert!(
        exports
            .iter()
            .all(|e| e.status == ExportStatus::Completed.as_str())
    );
}
