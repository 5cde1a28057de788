use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_drivers::Driver;
use super::m20250301_000005_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(uuid(Review::Id).primary_key())
                    .col(uuid(Review::BookingId).not_null().unique_key())
                    .col(uuid(Review::CustomerId).not_null())
                    .col(uuid(Review::DriverId).not_null())
                    .col(integer(Review::Rating).not_null())
                    .col(string_len(Review::Comment, 500).not_null().default(""))
                    .col(
                        timestamp_with_time_zone(Review::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_booking")
                            .from(Review::Table, Review::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_customer")
                            .from(Review::Table, Review::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_driver")
                            .from(Review::Table, Review::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_driver")
                    .table(Review::Table)
                    .col(Review::DriverId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Review::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Review {
    Table,
    Id,
    BookingId,
    CustomerId,
    DriverId,
    Rating,
    Comment,
    CreatedAt,
}
