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
                    .table(QuickMessage::Table)
                    .if_not_exists()
                    .col(uuid(QuickMessage::Id).primary_key())
                    .col(uuid(QuickMessage::BookingId).not_null())
                    .col(uuid(QuickMessage::SenderId).not_null())
                    .col(string_len(QuickMessage::SenderRole, 20).not_null())
                    .col(string_len(QuickMessage::MessageKey, 50).not_null())
                    .col(string_len(QuickMessage::MessageText, 255).not_null())
                    .col(
                        timestamp_with_time_zone(QuickMessage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quick_message_booking")
                            .from(QuickMessage::Table, QuickMessage::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quick_message_sender")
                            .from(QuickMessage::Table, QuickMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quick_message_booking_created")
                    .table(QuickMessage::Table)
                    .col(QuickMessage::BookingId)
                    .col(QuickMessage::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuickMessage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum QuickMessage {
    Table,
    Id,
    BookingId,
    SenderId,
    SenderRole,
    MessageKey,
    MessageText,
    CreatedAt,
}
