use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000005_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::BookingId).not_null())
                    .col(uuid(Payment::CustomerId).not_null())
                    .col(big_integer(Payment::Amount).not_null())
                    .col(string_len(Payment::Method, 20).not_null().default("card"))
                    .col(string_len(Payment::Status, 20).not_null().default("pending"))
                    .col(string_len(Payment::TransactionId, 64).not_null())
                    .col(big_integer(Payment::RefundAmount).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Payment::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Payment::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_booking")
                            .from(Payment::Table, Payment::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_customer")
                            .from(Payment::Table, Payment::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_booking")
                    .table(Payment::Table)
                    .col(Payment::BookingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Payment {
    Table,
    Id,
    BookingId,
    CustomerId,
    Amount,
    Method,
    Status,
    TransactionId,
    RefundAmount,
    CreatedAt,
    UpdatedAt,
}
