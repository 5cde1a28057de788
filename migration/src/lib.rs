pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_drivers;
mod m20250301_000003_create_vehicles;
mod m20250301_000004_create_pricing_rules;
mod m20250301_000005_create_bookings;
mod m20250301_000006_create_payments;
mod m20250301_000007_create_notifications;
mod m20250301_000008_create_reviews;
mod m20250301_000009_create_favorites;
mod m20250301_000010_create_quick_messages;
mod m20250301_000011_add_user_avatar_and_reset;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_drivers::Migration),
            Box::new(m20250301_000003_create_vehicles::Migration),
            Box::new(m20250301_000004_create_pricing_rules::Migration),
            Box::new(m20250301_000005_create_bookings::Migration),
            Box::new(m20250301_000006_create_payments::Migration),
            Box::new(m20250301_000007_create_notifications::Migration),
            Box::new(m20250301_000008_create_reviews::Migration),
            Box::new(m20250301_000009_create_favorites::Migration),
            Box::new(m20250301_000010_create_quick_messages::Migration),
            Box::new(m20250301_000011_add_user_avatar_and_reset::Migration),
        ]
    }
}
