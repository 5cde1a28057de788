use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "booking_new")]
    BookingNew,
    #[sea_orm(string_value = "booking_accepted")]
    BookingAccepted,
    #[sea_orm(string_value = "booking_rejected")]
    BookingRejected,
    #[sea_orm(string_value = "booking_cancelled")]
    BookingCancelled,
    #[sea_orm(string_value = "booking_completed")]
    BookingCompleted,
    #[sea_orm(string_value = "booking_active")]
    BookingActive,
    #[sea_orm(string_value = "docs_verified")]
    DocsVerified,
    #[sea_orm(string_value = "docs_rejected")]
    DocsRejected,
    #[sea_orm(string_value = "profile_approved")]
    ProfileApproved,
    #[sea_orm(string_value = "profile_rejected")]
    ProfileRejected,
    #[sea_orm(string_value = "payment_received")]
    PaymentReceived,
    #[sea_orm(string_value = "review_received")]
    ReviewReceived,
    #[sea_orm(string_value = "general")]
    General,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
