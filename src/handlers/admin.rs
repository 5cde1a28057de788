use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver::{self, ApprovalStatus, DocumentStatus};
use crate::entities::payment::{self, PaymentStatus};
use crate::entities::pricing_rule::{self, DurationType};
use crate::entities::user::{self, UserRole};
use crate::entities::vehicle::VehicleType;
use crate::error::{AppError, AppResult};
use crate::handlers::{
    booking_views, BookingResponse, BookingStatusFilter, BookingView, MessageResponse,
    ReasonRequest,
};
use crate::middleware::maintenance::MaintenanceStatus;
use crate::services::documents::{self, ReviewAction};
use crate::services::{booking as bookings, pricing};
use crate::AppState;

// ============ Dashboard ============

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_customers: u64,
    pub total_drivers: u64,
    pub pending_approvals: u64,
    pub pending_documents: u64,
    pub total_bookings: u64,
    pub active_bookings: u64,
    pub completed_bookings: u64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize)]
pub struct DriverWithAccount {
    pub driver: driver::Model,
    pub user: Option<user::Model>,
}

#[derive(Debug, Serialize)]
pub struct DriverListResponse {
    pub success: bool,
    pub drivers: Vec<DriverWithAccount>,
}

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub success: bool,
    pub driver: driver::Model,
}

#[derive(Debug, Serialize)]
pub struct DriverDocuments {
    pub driver_id: Uuid,
    pub name: String,
    pub license_number: String,
    pub license_image: String,
    pub id_proof_image: String,
    pub aadhaar_number: String,
    pub aadhaar_image: String,
    pub document_status: DocumentStatus,
    pub verification_remarks: String,
    pub verified_at: Option<DateTimeWithTimeZone>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub success: bool,
    pub documents: DriverDocuments,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<user::Model>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: user::Model,
}

#[derive(Debug, Serialize)]
pub struct AdminBookingListResponse {
    pub success: bool,
    pub bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
pub struct PricingListResponse {
    pub success: bool,
    pub rules: Vec<pricing_rule::Model>,
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub success: bool,
    pub rule: pricing_rule::Model,
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub success: bool,
    pub payments: Vec<payment::Model>,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub success: bool,
    pub maintenance: MaintenanceStatus,
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardResponse>> {
    let total_customers = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Customer))
        .count(&state.db)
        .await?;
    let total_drivers = driver::Entity::find().count(&state.db).await?;
    let pending_approvals = driver::Entity::find()
        .filter(driver::Column::IsApproved.eq(ApprovalStatus::Pending))
        .count(&state.db)
        .await?;
    let pending_documents = driver::Entity::find()
        .filter(driver::Column::DocumentStatus.eq(DocumentStatus::PendingReview))
        .count(&state.db)
        .await?;
    let total_bookings = booking::Entity::find().count(&state.db).await?;
    let active_bookings = booking::Entity::find()
        .filter(booking::Column::Status.is_in([BookingStatus::Confirmed, BookingStatus::Active]))
        .count(&state.db)
        .await?;
    let completed_bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .count(&state.db)
        .await?;

    let amounts: Vec<i64> = payment::Entity::find()
        .select_only()
        .column(payment::Column::Amount)
        .filter(payment::Column::Status.eq(PaymentStatus::Completed))
        .into_tuple()
        .all(&state.db)
        .await?;

    let stats = DashboardStats {
        total_customers,
        total_drivers,
        pending_approvals,
        pending_documents,
        total_bookings,
        active_bookings,
        completed_bookings,
        total_revenue: amounts.iter().sum(),
    };

    Ok(Json(DashboardResponse {
        success: true,
        stats,
    }))
}

// ============ Drivers ============

#[derive(Debug, Default, Deserialize)]
pub struct DriverFilter {
    pub status: Option<ApprovalStatus>,
}

pub async fn list_drivers(
    State(state): State<AppState>,
    Query(filter): Query<DriverFilter>,
) -> AppResult<Json<DriverListResponse>> {
    let mut select = driver::Entity::find();
    if let Some(status) = filter.status {
        select = select.filter(driver::Column::IsApproved.eq(status));
    }

    let drivers: Vec<DriverWithAccount> = select
        .order_by_desc(driver::Column::CreatedAt)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(driver, user)| DriverWithAccount { driver, user })
        .collect();

    Ok(Json(DriverListResponse {
        success: true,
        drivers,
    }))
}

pub async fn approve_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DriverResponse>> {
    let driver = documents::set_approval(&state, id, ApprovalStatus::Approved).await?;
    Ok(Json(DriverResponse {
        success: true,
        driver,
    }))
}

pub async fn reject_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DriverResponse>> {
    let driver = documents::set_approval(&state, id, ApprovalStatus::Rejected).await?;
    Ok(Json(DriverResponse {
        success: true,
        driver,
    }))
}

pub async fn driver_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentsResponse>> {
    let (driver, account) = driver::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    Ok(Json(DocumentsResponse {
        success: true,
        documents: DriverDocuments {
            driver_id: driver.id,
            name: account.map(|u| u.name).unwrap_or_default(),
            license_number: driver.license_number,
            license_image: driver.license_image,
            id_proof_image: driver.id_proof_image,
            aadhaar_number: driver.aadhaar_number,
            aadhaar_image: driver.aadhaar_image,
            document_status: driver.document_status,
            verification_remarks: driver.verification_remarks,
            verified_at: driver.verified_at,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub action: String,
    pub remarks: Option<String>,
}

pub async fn verify_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> AppResult<Json<DriverResponse>> {
    let action = ReviewAction::parse(&payload.action)?;
    let driver = documents::review(&state, id, action, payload.remarks).await?;

    Ok(Json(DriverResponse {
        success: true,
        driver,
    }))
}

// ============ Users ============

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<UserListResponse>> {
    let users = user::Entity::find()
        .filter(user::Column::Role.ne(UserRole::Admin))
        .order_by_desc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

/// Toggle the block flag. Blocking a driver also takes them offline.
pub async fn toggle_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let account = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if account.role == UserRole::Admin {
        return Err(AppError::BadRequest("Cannot block an admin".to_string()));
    }

    let blocked = !account.is_blocked;
    let mut active: user::ActiveModel = account.into();
    active.is_blocked = Set(blocked);
    let account = active.update(&state.db).await?;

    if blocked {
        if let Some(profile) = driver::Entity::find()
            .filter(driver::Column::UserId.eq(account.id))
            .one(&state.db)
            .await?
        {
            let mut active: driver::ActiveModel = profile.into();
            active.is_online = Set(false);
            active.update(&state.db).await?;
        }
    }

    tracing::info!(user_id = %account.id, blocked, "User block toggled");

    Ok(Json(UserResponse {
        success: true,
        user: account,
    }))
}

// ============ Bookings ============

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(filter): Query<BookingStatusFilter>,
) -> AppResult<Json<AdminBookingListResponse>> {
    let mut select = booking::Entity::find();
    if let Some(status) = filter.status {
        select = select.filter(booking::Column::Status.eq(status));
    }
    let found = select
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(AdminBookingListResponse {
        success: true,
        bookings: booking_views(&state.db, found).await?,
    }))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> AppResult<Json<BookingResponse>> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let booking = bookings::admin_cancel(&state, id, reason).await?;

    Ok(Json(BookingResponse::new(booking)))
}

// ============ Pricing rules ============

#[derive(Debug, Deserialize)]
pub struct CreatePricingRequest {
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub duration_type: DurationType,
    pub base_rate: i64,
    pub experience_multiplier_cap: Option<f64>,
    pub cancellation_penalty_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePricingRequest {
    pub base_rate: Option<i64>,
    pub experience_multiplier_cap: Option<f64>,
    pub cancellation_penalty_percent: Option<f64>,
}

pub async fn list_pricing(State(state): State<AppState>) -> AppResult<Json<PricingListResponse>> {
    let rules = pricing_rule::Entity::find()
        .order_by_asc(pricing_rule::Column::VehicleType)
        .all(&state.db)
        .await?;

    Ok(Json(PricingListResponse {
        success: true,
        rules,
    }))
}

pub async fn create_pricing(
    State(state): State<AppState>,
    Json(payload): Json<CreatePricingRequest>,
) -> AppResult<Json<PricingResponse>> {
    let cap = payload
        .experience_multiplier_cap
        .unwrap_or(pricing::DEFAULT_MULTIPLIER_CAP);
    let penalty = payload
        .cancellation_penalty_percent
        .unwrap_or(pricing::DEFAULT_PENALTY_PERCENT);
    pricing::validate_rule(payload.base_rate, cap, penalty)?;

    let existing = pricing::find_rule(&state.db, payload.vehicle_type, payload.duration_type).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "A pricing rule for this vehicle type and duration already exists".to_string(),
        ));
    }

    let rule = pricing_rule::ActiveModel {
        id: Set(Uuid::new_v4()),
        vehicle_type: Set(payload.vehicle_type),
        duration_type: Set(payload.duration_type),
        base_rate: Set(payload.base_rate),
        experience_multiplier_cap: Set(cap),
        cancellation_penalty_percent: Set(penalty),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(rule_id = %rule.id, vehicle_type = ?rule.vehicle_type, base_rate = rule.base_rate, "Pricing rule created");

    Ok(Json(PricingResponse {
        success: true,
        rule,
    }))
}

pub async fn update_pricing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePricingRequest>,
) -> AppResult<Json<PricingResponse>> {
    let rule = pricing_rule::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pricing rule not found".to_string()))?;

    let base_rate = payload.base_rate.unwrap_or(rule.base_rate);
    let cap = payload
        .experience_multiplier_cap
        .unwrap_or(rule.experience_multiplier_cap);
    let penalty = payload
        .cancellation_penalty_percent
        .unwrap_or(rule.cancellation_penalty_percent);
    pricing::validate_rule(base_rate, cap, penalty)?;

    let mut active: pricing_rule::ActiveModel = rule.into();
    active.base_rate = Set(base_rate);
    active.experience_multiplier_cap = Set(cap);
    active.cancellation_penalty_percent = Set(penalty);
    active.updated_at = Set(Utc::now().into());
    let rule = active.update(&state.db).await?;

    tracing::info!(rule_id = %rule.id, base_rate, "Pricing rule updated");

    Ok(Json(PricingResponse {
        success: true,
        rule,
    }))
}

pub async fn delete_pricing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let result = pricing_rule::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Pricing rule not found".to_string()));
    }

    tracing::info!(rule_id = %id, "Pricing rule deleted");

    Ok(Json(MessageResponse::new("Pricing rule deleted")))
}

// ============ Payments & maintenance ============

pub async fn list_payments(State(state): State<AppState>) -> AppResult<Json<PaymentListResponse>> {
    let payments = payment::Entity::find()
        .order_by_desc(payment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(PaymentListResponse {
        success: true,
        payments,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub enabled: bool,
    pub message: Option<String>,
}

pub async fn get_maintenance(State(state): State<AppState>) -> Json<MaintenanceResponse> {
    Json(MaintenanceResponse {
        success: true,
        maintenance: state.maintenance.status().await,
    })
}

pub async fn set_maintenance(
    State(state): State<AppState>,
    Json(payload): Json<MaintenanceRequest>,
) -> AppResult<Json<MaintenanceResponse>> {
    let status = state.maintenance.set(payload.enabled, payload.message).await;

    tracing::warn!(enabled = status.enabled, "Maintenance mode changed");

    Ok(Json(MaintenanceResponse {
        success: true,
        maintenance: status,
    }))
}
