use sea_orm_migration::prelude::*;

use crate::m20260110_000001_init::Members;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum AccountingExports {
    Table,
    Id,
    SignerMemberId,
    Status,
    Aggregation,
    StartDate,
    EndDate,
    Content,
    CreatedAt,
    CompletedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountingExports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountingExports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountingExports::SignerMemberId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountingExports::Status).string().not_null())
                    .col(
                        ColumnDef::new(AccountingExports::Aggregation)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingExports::StartDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountingExports::EndDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountingExports::Content).text())
                    .col(
                        ColumnDef::new(AccountingExports::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountingExports::CompletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounting_exports-signer_member_id")
                            .from(
                                AccountingExports::Table,
                                AccountingExports::SignerMemberId,
                            )
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The worker claims pending rows oldest-first.
        manager
            .create_index(
                Index::create()
                    .name("idx-accounting_exports-status-created_at")
                    .table(AccountingExports::Table)
                    .col(AccountingExports::Status)
                    .col(AccountingExports::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountingExports::Table).to_owned())
            .await?;
        Ok(())
    }
}
