pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use middleware::maintenance::MaintenanceSwitch;
use services::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub notifier: Notifier,
    pub maintenance: MaintenanceSwitch,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let notifier = Notifier::new(db.clone());
        let maintenance = MaintenanceSwitch::new(config.maintenance_message.clone());

        Self {
            db,
            config,
            notifier,
            maintenance,
        }
    }
}
