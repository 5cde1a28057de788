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
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(uuid(Notification::Id).primary_key())
                    .col(uuid(Notification::UserId).not_null())
                    .col(string_len(Notification::Kind, 30).not_null())
                    .col(string(Notification::Title).not_null())
                    .col(text(Notification::Message).not_null())
                    .col(string(Notification::Link).not_null().default(""))
                    .col(boolean(Notification::IsRead).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Notification::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_user")
                            .from(Notification::Table, Notification::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_inbox")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .col(Notification::IsRead)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Notification {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    Message,
    Link,
    IsRead,
    CreatedAt,
}
