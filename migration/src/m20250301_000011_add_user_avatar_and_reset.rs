use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(User::Table)
                    .add_column(string_len(User::Avatar, 500).not_null().default(""))
                    .add_column(string_len_null(User::ResetTokenHash, 255))
                    .add_column(timestamp_with_time_zone_null(User::ResetTokenExpiresAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(User::Table)
                    .drop_column(User::ResetTokenExpiresAt)
                    .drop_column(User::ResetTokenHash)
                    .drop_column(User::Avatar)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Avatar,
    ResetTokenHash,
    ResetTokenExpiresAt,
}
