use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PricingRule::Table)
                    .if_not_exists()
                    .col(uuid(PricingRule::Id).primary_key())
                    .col(string_len(PricingRule::VehicleType, 10).not_null())
                    .col(string_len(PricingRule::DurationType, 10).not_null().default("monthly"))
                    .col(big_integer(PricingRule::BaseRate).not_null())
                    .col(double(PricingRule::ExperienceMultiplierCap).not_null().default(1.0))
                    .col(double(PricingRule::CancellationPenaltyPercent).not_null().default(10.0))
                    .col(
                        timestamp_with_time_zone(PricingRule::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(PricingRule::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One rule per (vehicle type, duration type)
        manager
            .create_index(
                Index::create()
                    .name("idx_pricing_rule_key")
                    .table(PricingRule::Table)
                    .col(PricingRule::VehicleType)
                    .col(PricingRule::DurationType)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PricingRule::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PricingRule {
    Table,
    Id,
    VehicleType,
    DurationType,
    BaseRate,
    ExperienceMultiplierCap,
    CancellationPenaltyPercent,
    CreatedAt,
    UpdatedAt,
}
