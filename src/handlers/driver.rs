use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver::{self, DocumentStatus, Languages, VehicleTypes};
use crate::entities::vehicle::VehicleType;
use crate::entities::{review, user};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::validate_experience;
use crate::handlers::{
    booking_views, BookingResponse, BookingStatusFilter, BookingView, ReasonRequest,
};
use crate::services::{booking as bookings, documents};
use crate::utils::jwt::Claims;
use crate::AppState;

const PUBLIC_REVIEW_COUNT: u64 = 10;

/// Driver profile of the logged-in user
pub(crate) async fn current_driver(state: &AppState, claims: &Claims) -> AppResult<driver::Model> {
    driver::Entity::find()
        .filter(driver::Column::UserId.eq(claims.sub))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))
}

#[derive(Debug, Serialize)]
pub struct PublicDriver {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub experience: i32,
    pub languages: Languages,
    pub vehicle_types: VehicleTypes,
    pub rating: f64,
    pub total_reviews: i32,
    pub completed_jobs: i32,
    pub is_online: bool,
    pub document_status: DocumentStatus,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub success: bool,
    pub driver: PublicDriver,
    pub reviews: Vec<review::Model>,
}

#[derive(Debug, Serialize)]
pub struct DriverProfileResponse {
    pub success: bool,
    pub driver: driver::Model,
    pub user: Option<user::Model>,
}

#[derive(Debug, Serialize)]
pub struct DocumentsUploadedResponse {
    pub success: bool,
    pub message: &'static str,
    pub driver: driver::Model,
}

#[derive(Debug, Serialize)]
pub struct OnlineResponse {
    pub success: bool,
    pub is_online: bool,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub success: bool,
    pub jobs: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    pub success: bool,
    pub total_earnings: i64,
    pub completed_jobs: usize,
    pub rating: f64,
    pub bookings: Vec<booking::Model>,
}

#[derive(Debug, Serialize)]
pub struct DriverReviewsResponse {
    pub success: bool,
    pub rating: f64,
    pub total_reviews: i32,
    pub reviews: Vec<review::Model>,
}

// ============ Profile ============

pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PublicProfileResponse>> {
    let (driver, account) = driver::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    let reviews = review::Entity::find()
        .filter(review::Column::DriverId.eq(driver.id))
        .order_by_desc(review::Column::CreatedAt)
        .limit(PUBLIC_REVIEW_COUNT)
        .all(&state.db)
        .await?;

    Ok(Json(PublicProfileResponse {
        success: true,
        driver: PublicDriver {
            id: driver.id,
            name: account.map(|u| u.name).unwrap_or_default(),
            city: driver.city,
            experience: driver.experience,
            languages: driver.languages,
            vehicle_types: driver.vehicle_types,
            rating: driver.rating,
            total_reviews: driver.total_reviews,
            completed_jobs: driver.completed_jobs,
            is_online: driver.is_online,
            document_status: driver.document_status,
        },
        reviews,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DriverProfileResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let account = user::Entity::find_by_id(claims.sub).one(&state.db).await?;

    Ok(Json(DriverProfileResponse {
        success: true,
        driver,
        user: account,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub experience: Option<i32>,
    pub languages: Option<Vec<String>>,
    pub vehicle_types: Option<Vec<VehicleType>>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<DriverProfileResponse>> {
    if let Some(experience) = payload.experience {
        validate_experience(experience)?;
    }
    if payload.vehicle_types.as_ref().is_some_and(Vec::is_empty) {
        return Err(AppError::BadRequest(
            "Select at least one vehicle type".to_string(),
        ));
    }

    let driver = current_driver(&state, &claims).await?;
    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let txn = state.db.begin().await?;

    let mut active_user: user::ActiveModel = account.into();
    if let Some(name) = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        active_user.name = Set(name);
    }
    if let Some(phone) = payload.phone {
        active_user.phone = Set(phone.trim().to_string());
    }
    if let Some(city) = &payload.city {
        active_user.city = Set(city.trim().to_string());
    }
    let account = active_user.update(&txn).await?;

    let mut active: driver::ActiveModel = driver.into();
    if let Some(city) = payload.city {
        active.city = Set(city.trim().to_string());
    }
    if let Some(experience) = payload.experience {
        active.experience = Set(experience);
    }
    if let Some(languages) = payload.languages {
        active.languages = Set(Languages(languages));
    }
    if let Some(vehicle_types) = payload.vehicle_types {
        active.vehicle_types = Set(VehicleTypes(vehicle_types));
    }
    let driver = active.update(&txn).await?;

    txn.commit().await?;

    Ok(Json(DriverProfileResponse {
        success: true,
        driver,
        user: Some(account),
    }))
}

pub async fn upload_documents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<documents::DocumentUpload>,
) -> AppResult<Json<DocumentsUploadedResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let driver = documents::upload(&state, driver, payload).await?;

    Ok(Json(DocumentsUploadedResponse {
        success: true,
        message: "Documents uploaded. Awaiting admin review.",
        driver,
    }))
}

pub async fn toggle_online(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<OnlineResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let driver = documents::toggle_online(&state, driver).await?;

    Ok(Json(OnlineResponse {
        success: true,
        is_online: driver.is_online,
    }))
}

// ============ Jobs ============

pub async fn my_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<BookingStatusFilter>,
) -> AppResult<Json<JobListResponse>> {
    let driver = current_driver(&state, &claims).await?;

    let mut select = booking::Entity::find().filter(booking::Column::DriverId.eq(driver.id));
    if let Some(status) = filter.status {
        select = select.filter(booking::Column::Status.eq(status));
    }
    let found = select
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(JobListResponse {
        success: true,
        jobs: booking_views(&state.db, found).await?,
    }))
}

pub async fn accept_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let booking = bookings::accept(&state, driver.id, id).await?;

    Ok(Json(BookingResponse::new(booking)))
}

pub async fn reject_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> AppResult<Json<BookingResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let reason = payload.and_then(|Json(p)| p.reason);
    let booking = bookings::reject(&state, driver.id, id, reason).await?;

    Ok(Json(BookingResponse::new(booking)))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> AppResult<Json<BookingResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let reason = payload.and_then(|Json(p)| p.reason);
    let booking = bookings::driver_cancel(&state, driver.id, id, reason).await?;

    Ok(Json(BookingResponse::new(booking)))
}

pub async fn complete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let driver = current_driver(&state, &claims).await?;
    let booking = bookings::complete(&state, driver.id, id).await?;

    Ok(Json(BookingResponse::new(booking)))
}

// ============ Earnings & reviews ============

pub async fn earnings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<EarningsResponse>> {
    let driver = current_driver(&state, &claims).await?;

    let completed = booking::Entity::find()
        .filter(booking::Column::DriverId.eq(driver.id))
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .order_by_desc(booking::Column::UpdatedAt)
        .all(&state.db)
        .await?;
    let total: i64 = completed.iter().map(|b| b.total_price).sum();

    Ok(Json(EarningsResponse {
        success: true,
        total_earnings: total,
        completed_jobs: completed.len(),
        rating: driver.rating,
        bookings: completed,
    }))
}

pub async fn my_reviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DriverReviewsResponse>> {
    let driver = current_driver(&state, &claims).await?;

    let reviews = review::Entity::find()
        .filter(review::Column::DriverId.eq(driver.id))
        .order_by_desc(review::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(DriverReviewsResponse {
        success: true,
        rating: driver.rating,
        total_reviews: driver.total_reviews,
        reviews,
    }))
}
