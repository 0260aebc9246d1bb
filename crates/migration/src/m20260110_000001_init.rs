//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Verkstad:
//!
//! - `members`: authentication and export signers
//! - `products`: webshop products referenced by transaction contents
//! - `transactions`: the internal money ledger
//! - `transaction_contents`: per-product rows of a transaction
//! - `transaction_accounts`: chart-of-accounts entries
//! - `transaction_cost_centers`: accounting cost-center dimension
//! - `product_accounts_cost_centers`: per-product allocation rules

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Members {
    Table,
    Id,
    Username,
    Password,
    Firstname,
    Lastname,
    ExportPermission,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    MemberId,
    AmountMinor,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum TransactionContents {
    Table,
    Id,
    TransactionId,
    ProductId,
    Count,
    AmountMinor,
}

#[derive(Iden)]
enum TransactionAccounts {
    Table,
    Id,
    Account,
    Description,
}

#[derive(Iden)]
enum TransactionCostCenters {
    Table,
    Id,
    CostCenter,
    Description,
}

#[derive(Iden)]
enum ProductAccountsCostCenters {
    Table,
    Id,
    ProductId,
    AccountId,
    CostCenterId,
    Fraction,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Members::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Members::Password).string().not_null())
                    .col(ColumnDef::new(Members::Firstname).string().not_null())
                    .col(ColumnDef::new(Members::Lastname).string().not_null())
                    .col(
                        ColumnDef::new(Members::ExportPermission)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::MemberId).integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-member_id")
                            .from(Transactions::Table, Transactions::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-status-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionContents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionContents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionContents::TransactionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionContents::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionContents::Count)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionContents::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_contents-transaction_id")
                            .from(
                                TransactionContents::Table,
                                TransactionContents::TransactionId,
                            )
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_contents-product_id")
                            .from(TransactionContents::Table, TransactionContents::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transaction_contents-transaction_id")
                    .table(TransactionContents::Table)
                    .col(TransactionContents::TransactionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionAccounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionAccounts::Account)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionAccounts::Description)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionCostCenters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionCostCenters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionCostCenters::CostCenter)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionCostCenters::Description)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductAccountsCostCenters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductAccountsCostCenters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductAccountsCostCenters::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductAccountsCostCenters::AccountId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductAccountsCostCenters::CostCenterId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductAccountsCostCenters::Fraction)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-product_accounts_cost_centers-product_id")
                            .from(
                                ProductAccountsCostCenters::Table,
                                ProductAccountsCostCenters::ProductId,
                            )
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-product_accounts_cost_centers-account_id")
                            .from(
                                ProductAccountsCostCenters::Table,
                                ProductAccountsCostCenters::AccountId,
                            )
                            .to(TransactionAccounts::Table, TransactionAccounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-product_accounts_cost_centers-cost_center_id")
                            .from(
                                ProductAccountsCostCenters::Table,
                                ProductAccountsCostCenters::CostCenterId,
                            )
                            .to(
                                TransactionCostCenters::Table,
                                TransactionCostCenters::Id,
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-product_accounts_cost_centers-product_id")
                    .table(ProductAccountsCostCenters::Table)
                    .col(ProductAccountsCostCenters::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ProductAccountsCostCenters::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionCostCenters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionContents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        Ok(())
    }
}
