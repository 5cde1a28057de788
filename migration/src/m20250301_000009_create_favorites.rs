use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000002_create_drivers::Driver;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Favorite::Table)
                    .if_not_exists()
                    .col(uuid(Favorite::Id).primary_key())
                    .col(uuid(Favorite::UserId).not_null())
                    .col(uuid(Favorite::DriverId).not_null())
                    .col(
                        timestamp_with_time_zone(Favorite::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favorite_user")
                            .from(Favorite::Table, Favorite::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favorite_driver")
                            .from(Favorite::Table, Favorite::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One favorite per customer and driver
        manager
            .create_index(
                Index::create()
                    .name("idx_favorite_user_driver")
                    .table(Favorite::Table)
                    .col(Favorite::UserId)
                    .col(Favorite::DriverId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Favorite::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Favorite {
    Table,
    Id,
    UserId,
    DriverId,
    CreatedAt,
}
