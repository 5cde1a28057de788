use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Driver::Table)
                    .if_not_exists()
                    .col(uuid(Driver::Id).primary_key())
                    .col(uuid(Driver::UserId).not_null().unique_key())
                    .col(string_len(Driver::LicenseNumber, 50).not_null().default(""))
                    .col(string(Driver::LicenseImage).not_null().default(""))
                    .col(string(Driver::IdProofImage).not_null().default(""))
                    .col(string_len(Driver::AadhaarNumber, 12).not_null().default(""))
                    .col(string(Driver::AadhaarImage).not_null().default(""))
                    .col(
                        string_len(Driver::DocumentStatus, 20)
                            .not_null()
                            .default("not_uploaded"),
                    )
                    .col(string(Driver::VerificationRemarks).not_null().default(""))
                    .col(timestamp_with_time_zone_null(Driver::VerifiedAt))
                    .col(integer(Driver::Experience).not_null().default(0))
                    .col(json_binary(Driver::Languages).not_null())
                    .col(json_binary(Driver::VehicleTypes).not_null())
                    .col(string_len(Driver::City, 100).not_null().default(""))
                    .col(string_len(Driver::IsApproved, 20).not_null().default("pending"))
                    .col(boolean(Driver::IsOnline).not_null().default(false))
                    .col(double(Driver::Rating).not_null().default(0.0))
                    .col(integer(Driver::TotalReviews).not_null().default(0))
                    .col(big_integer(Driver::TotalEarnings).not_null().default(0))
                    .col(integer(Driver::CompletedJobs).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Driver::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_user")
                            .from(Driver::Table, Driver::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_driver_search")
                    .table(Driver::Table)
                    .col(Driver::City)
                    .col(Driver::IsApproved)
                    .col(Driver::IsOnline)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Driver::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Driver {
    Table,
    Id,
    UserId,
    LicenseNumber,
    LicenseImage,
    IdProofImage,
    AadhaarNumber,
    AadhaarImage,
    DocumentStatus,
    VerificationRemarks,
    VerifiedAt,
    Experience,
    Languages,
    VehicleTypes,
    City,
    IsApproved,
    IsOnline,
    Rating,
    TotalReviews,
    TotalEarnings,
    CompletedJobs,
    CreatedAt,
}
