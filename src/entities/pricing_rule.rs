use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::vehicle::VehicleType;

/// Engagement length a rule prices. Only monthly engagements exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    #[default]
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pricing_rule")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vehicle_type: VehicleType,
    pub duration_type: DurationType,
    /// Monthly rate in whole rupees
    pub base_rate: i64,
    pub experience_multiplier_cap: f64,
    pub cancellation_penalty_percent: f64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
