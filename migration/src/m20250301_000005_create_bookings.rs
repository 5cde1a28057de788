use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_drivers::Driver;
use super::m20250301_000003_create_vehicles::Vehicle;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::CustomerId).not_null())
                    .col(uuid(Booking::DriverId).not_null())
                    .col(uuid(Booking::VehicleId).not_null())
                    .col(timestamp_with_time_zone(Booking::StartTime).not_null())
                    .col(timestamp_with_time_zone(Booking::EndTime).not_null())
                    .col(string_len(Booking::DurationType, 10).not_null().default("monthly"))
                    .col(string_len(Booking::Status, 20).not_null().default("pending"))
                    .col(big_integer(Booking::TotalPrice).not_null())
                    .col(string(Booking::PickupLocation).not_null())
                    .col(text(Booking::Notes).not_null().default(""))
                    .col(string_len(Booking::PaymentMethod, 20).not_null().default("cash"))
                    .col(string_len(Booking::PaymentStatus, 20).not_null().default("unpaid"))
                    .col(text(Booking::CancellationReason).not_null().default(""))
                    .col(string_len_null(Booking::CancelledBy, 20))
                    .col(big_integer(Booking::CancellationPenalty).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_customer")
                            .from(Booking::Table, Booking::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_driver")
                            .from(Booking::Table, Booking::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_vehicle")
                            .from(Booking::Table, Booking::VehicleId)
                            .to(Vehicle::Table, Vehicle::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_driver_status")
                    .table(Booking::Table)
                    .col(Booking::DriverId)
                    .col(Booking::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_customer_status")
                    .table(Booking::Table)
                    .col(Booking::CustomerId)
                    .col(Booking::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    CustomerId,
    DriverId,
    VehicleId,
    StartTime,
    EndTime,
    DurationType,
    Status,
    TotalPrice,
    PickupLocation,
    Notes,
    PaymentMethod,
    PaymentStatus,
    CancellationReason,
    CancelledBy,
    CancellationPenalty,
    CreatedAt,
    UpdatedAt,
}
