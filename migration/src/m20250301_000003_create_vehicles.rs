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
                    .table(Vehicle::Table)
                    .if_not_exists()
                    .col(uuid(Vehicle::Id).primary_key())
                    .col(uuid(Vehicle::OwnerId).not_null())
                    .col(string_len(Vehicle::VehicleType, 10).not_null())
                    .col(string_len(Vehicle::Make, 50).not_null())
                    .col(string_len(Vehicle::Model, 50).not_null())
                    .col(integer(Vehicle::Year).not_null())
                    .col(string_len(Vehicle::PlateNumber, 20).not_null())
                    .col(string_len(Vehicle::Transmission, 10).not_null())
                    .col(string_len(Vehicle::FuelType, 10).not_null())
                    .col(string_len(Vehicle::Color, 30).not_null().default(""))
                    .col(
                        timestamp_with_time_zone(Vehicle::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vehicle_owner")
                            .from(Vehicle::Table, Vehicle::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicle_owner")
                    .table(Vehicle::Table)
                    .col(Vehicle::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vehicle::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vehicle {
    Table,
    Id,
    OwnerId,
    VehicleType,
    Make,
    Model,
    Year,
    PlateNumber,
    Transmission,
    FuelType,
    Color,
    CreatedAt,
}
