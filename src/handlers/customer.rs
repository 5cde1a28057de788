use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentMethod};
use crate::entities::driver::{self, ApprovalStatus, DocumentStatus, Languages, VehicleTypes};
use crate::entities::pricing_rule::DurationType;
use crate::entities::vehicle::{self, FuelType, Transmission, VehicleType};
use crate::entities::{favorite, payment, review as review_entity, user};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserInfo;
use crate::handlers::{
    booking_views, BookingResponse, BookingStatusFilter, BookingView, MessageResponse,
    ReasonRequest,
};
use crate::services::payment::GatewayOrder;
use crate::services::{booking as bookings, payment as payments, pricing, review};
use crate::utils::jwt::Claims;
use crate::AppState;

const SEARCH_LIMIT: usize = 50;
const MAX_AVATAR_LEN: usize = 500;
const VEHICLE_YEARS: std::ops::RangeInclusive<i32> = 1990..=2030;

#[derive(Debug, Serialize)]
pub struct VehicleResponse {
    pub success: bool,
    pub vehicle: vehicle::Model,
}

#[derive(Debug, Serialize)]
pub struct VehicleListResponse {
    pub success: bool,
    pub vehicles: Vec<vehicle::Model>,
}

#[derive(Debug, Serialize)]
pub struct DriverListResponse {
    pub success: bool,
    pub count: usize,
    pub drivers: Vec<DriverCard>,
}

#[derive(Debug, Serialize)]
pub struct PriceEstimateResponse {
    pub success: bool,
    pub price: i64,
    pub months: i64,
    pub days: i64,
    pub duration_type: DurationType,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    pub success: bool,
    pub penalty: i64,
    pub booking: booking::Model,
    pub refund: Option<payment::Model>,
}

#[derive(Debug, Serialize)]
pub struct ExtendBookingResponse {
    pub success: bool,
    pub booking: booking::Model,
    pub additional_price: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub success: bool,
    pub order: GatewayOrder,
    pub booking: booking::Model,
}

#[derive(Debug, Serialize)]
pub struct PaymentConfirmedResponse {
    pub success: bool,
    pub message: &'static str,
    pub booking: booking::Model,
    pub payment: payment::Model,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: review_entity::Model,
}

#[derive(Debug, Serialize)]
pub struct Invoice {
    pub payment: payment::Model,
    pub booking: Option<booking::Model>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub success: bool,
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct FavoriteToggleResponse {
    pub success: bool,
    pub favorited: bool,
}

// ============ Profile ============

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomerProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
}

fn validate_profile_update(payload: &UpdateCustomerProfileRequest) -> AppResult<()> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("Name cannot be empty".to_string()));
    }
    if let Some(avatar) = payload.avatar.as_deref().map(str::trim) {
        let is_url = avatar.starts_with("https://") || avatar.starts_with("http://");
        if !avatar.is_empty() && !is_url {
            return Err(AppError::BadRequest("Avatar must be an image URL".to_string()));
        }
        if avatar.len() > MAX_AVATAR_LEN {
            return Err(AppError::BadRequest("Avatar URL is too long".to_string()));
        }
    }
    Ok(())
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ProfileResponse>> {
    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: account.into(),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateCustomerProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    validate_profile_update(&payload)?;

    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut active: user::ActiveModel = account.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(city) = payload.city {
        active.city = Set(city.trim().to_string());
    }
    if let Some(avatar) = payload.avatar {
        active.avatar = Set(avatar.trim().to_string());
    }
    let account = active.update(&state.db).await?;

    Ok(Json(ProfileResponse {
        success: true,
        user: account.into(),
    }))
}

// ============ Favorites ============

/// Bookmark a driver, or drop the bookmark if it is already there
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(driver_id): Path<Uuid>,
) -> AppResult<Json<FavoriteToggleResponse>> {
    let driver = driver::Entity::find_by_id(driver_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    let existing = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(claims.sub))
        .filter(favorite::Column::DriverId.eq(driver.id))
        .one(&state.db)
        .await?;

    let favorited = match existing {
        Some(found) => {
            favorite::Entity::delete_by_id(found.id)
                .exec(&state.db)
                .await?;
            false
        }
        None => {
            favorite::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(claims.sub),
                driver_id: Set(driver.id),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
            true
        }
    };

    tracing::debug!(user_id = %claims.sub, driver_id = %driver.id, favorited, "Favorite toggled");

    Ok(Json(FavoriteToggleResponse {
        success: true,
        favorited,
    }))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DriverListResponse>> {
    let drivers: Vec<driver::Model> = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(claims.sub))
        .order_by_desc(favorite::Column::CreatedAt)
        .find_also_related(driver::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .filter_map(|(_, d)| d)
        .collect();

    let user_ids: Vec<Uuid> = drivers.iter().map(|d| d.user_id).collect();
    let names: HashMap<Uuid, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let drivers: Vec<DriverCard> = drivers
        .into_iter()
        .map(|d| {
            let name = names.get(&d.user_id).cloned().unwrap_or_default();
            DriverCard::new(d, name)
        })
        .collect();

    Ok(Json(DriverListResponse {
        success: true,
        count: drivers.len(),
        drivers,
    }))
}

// ============ Vehicles ============

#[derive(Debug, Deserialize)]
pub struct VehicleRequest {
    pub vehicle_type: VehicleType,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub plate_number: String,
    pub transmission: Transmission,
    pub fuel_type: FuelType,
    #[serde(default)]
    pub color: String,
}

fn validate_vehicle(payload: &VehicleRequest) -> AppResult<()> {
    if payload.make.trim().is_empty() || payload.model.trim().is_empty() {
        return Err(AppError::BadRequest("Make and model are required".to_string()));
    }
    if payload.plate_number.trim().is_empty() {
        return Err(AppError::BadRequest("Plate number is required".to_string()));
    }
    if !VEHICLE_YEARS.contains(&payload.year) {
        return Err(AppError::BadRequest(format!(
            "Year must be between {} and {}",
            VEHICLE_YEARS.start(),
            VEHICLE_YEARS.end()
        )));
    }
    Ok(())
}

async fn own_vehicle(state: &AppState, owner_id: Uuid, vehicle_id: Uuid) -> AppResult<vehicle::Model> {
    vehicle::Entity::find_by_id(vehicle_id)
        .filter(vehicle::Column::OwnerId.eq(owner_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<VehicleListResponse>> {
    let vehicles = vehicle::Entity::find()
        .filter(vehicle::Column::OwnerId.eq(claims.sub))
        .order_by_desc(vehicle::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(VehicleListResponse {
        success: true,
        vehicles,
    }))
}

pub async fn add_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<VehicleRequest>,
) -> AppResult<Json<VehicleResponse>> {
    validate_vehicle(&payload)?;

    let vehicle = vehicle::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(claims.sub),
        vehicle_type: Set(payload.vehicle_type),
        make: Set(payload.make.trim().to_string()),
        model: Set(payload.model.trim().to_string()),
        year: Set(payload.year),
        plate_number: Set(payload.plate_number.trim().to_uppercase()),
        transmission: Set(payload.transmission),
        fuel_type: Set(payload.fuel_type),
        color: Set(payload.color.trim().to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(VehicleResponse {
        success: true,
        vehicle,
    }))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehicleRequest>,
) -> AppResult<Json<VehicleResponse>> {
    validate_vehicle(&payload)?;
    let existing = own_vehicle(&state, claims.sub, id).await?;

    let mut active: vehicle::ActiveModel = existing.into();
    active.vehicle_type = Set(payload.vehicle_type);
    active.make = Set(payload.make.trim().to_string());
    active.model = Set(payload.model.trim().to_string());
    active.year = Set(payload.year);
    active.plate_number = Set(payload.plate_number.trim().to_uppercase());
    active.transmission = Set(payload.transmission);
    active.fuel_type = Set(payload.fuel_type);
    active.color = Set(payload.color.trim().to_string());
    let vehicle = active.update(&state.db).await?;

    Ok(Json(VehicleResponse {
        success: true,
        vehicle,
    }))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let existing = own_vehicle(&state, claims.sub, id).await?;

    let used = booking::Entity::find()
        .filter(booking::Column::VehicleId.eq(existing.id))
        .count(&state.db)
        .await?;
    if used > 0 {
        return Err(AppError::BadRequest(
            "Vehicle has bookings and cannot be removed".to_string(),
        ));
    }

    vehicle::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Vehicle removed")))
}

// ============ Driver search & pricing ============

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub city: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DriverCard {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub experience: i32,
    pub languages: Languages,
    pub vehicle_types: VehicleTypes,
    pub rating: f64,
    pub total_reviews: i32,
    pub completed_jobs: i32,
}

impl DriverCard {
    fn new(driver: driver::Model, name: String) -> Self {
        Self {
            id: driver.id,
            name,
            city: driver.city,
            experience: driver.experience,
            languages: driver.languages,
            vehicle_types: driver.vehicle_types,
            rating: driver.rating,
            total_reviews: driver.total_reviews,
            completed_jobs: driver.completed_jobs,
        }
    }
}

fn matches_search(driver: &driver::Model, query: &SearchQuery) -> bool {
    let city_ok = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .is_none_or(|c| driver.city.to_lowercase().contains(&c.to_lowercase()));
    let type_ok = query
        .vehicle_type
        .is_none_or(|t| driver.vehicle_types.contains(t));

    city_ok && type_ok
}

/// Approved, verified drivers who are online, best rated first
pub async fn search_drivers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<DriverListResponse>> {
    let mut select = driver::Entity::find()
        .filter(driver::Column::IsApproved.eq(ApprovalStatus::Approved))
        .filter(driver::Column::IsOnline.eq(true))
        .filter(driver::Column::DocumentStatus.eq(DocumentStatus::Verified));
    if let Some(min_rating) = query.min_rating {
        select = select.filter(driver::Column::Rating.gte(min_rating));
    }

    let found = select
        .order_by_desc(driver::Column::Rating)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let drivers: Vec<DriverCard> = found
        .into_iter()
        .filter(|(d, _)| matches_search(d, &query))
        .take(SEARCH_LIMIT)
        .map(|(d, u)| DriverCard::new(d, u.map(|u| u.name).unwrap_or_default()))
        .collect();

    Ok(Json(DriverListResponse {
        success: true,
        count: drivers.len(),
        drivers,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PriceEstimateQuery {
    pub driver_id: Uuid,
    pub vehicle_type: VehicleType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Quote without booking anything
pub async fn price_estimate(
    State(state): State<AppState>,
    Query(query): Query<PriceEstimateQuery>,
) -> AppResult<Json<PriceEstimateResponse>> {
    if query.end_date <= query.start_date {
        return Err(AppError::BadRequest(
            "End date must be after start date".to_string(),
        ));
    }

    let driver = driver::Entity::find_by_id(query.driver_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    let price = pricing::quote_price(
        &state.db,
        query.vehicle_type,
        DurationType::Monthly,
        query.start_date,
        query.end_date,
        driver.experience,
    )
    .await?;

    Ok(Json(PriceEstimateResponse {
        success: true,
        price,
        months: pricing::billable_months(query.start_date, query.end_date),
        days: pricing::duration_days(query.start_date, query.end_date),
        duration_type: DurationType::Monthly,
    }))
}

// ============ Bookings ============

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub pickup_location: String,
    #[serde(default)]
    pub notes: String,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub extra_months: i64,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_id: Uuid,
    pub gateway_payment_id: Option<String>,
    pub order_id: Option<String>,
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<BookingStatusFilter>,
) -> AppResult<Json<BookingListResponse>> {
    let mut select = booking::Entity::find().filter(booking::Column::CustomerId.eq(claims.sub));
    if let Some(status) = filter.status {
        select = select.filter(booking::Column::Status.eq(status));
    }

    let found = select
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let views: Vec<BookingView> = booking_views(&state.db, found).await?;

    Ok(Json(BookingListResponse {
        success: true,
        bookings: views,
    }))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let payment_method = payload
        .payment_method
        .as_deref()
        .and_then(PaymentMethod::from_label)
        .unwrap_or_default();

    let booking = bookings::create(
        &state,
        claims.sub,
        bookings::NewBooking {
            driver_id: payload.driver_id,
            vehicle_id: payload.vehicle_id,
            start_time: payload.start_date,
            end_time: payload.end_date,
            pickup_location: payload.pickup_location,
            notes: payload.notes,
            payment_method,
        },
    )
    .await?;

    Ok(Json(BookingResponse::new(booking)))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReasonRequest>>,
) -> AppResult<Json<CancelBookingResponse>> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let (booking, refund) = bookings::customer_cancel(&state, claims.sub, id, reason).await?;

    Ok(Json(CancelBookingResponse {
        success: true,
        penalty: booking.cancellation_penalty,
        booking,
        refund,
    }))
}

pub async fn extend_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendRequest>,
) -> AppResult<Json<ExtendBookingResponse>> {
    let (booking, additional_price) =
        bookings::extend(&state, claims.sub, id, payload.extra_months).await?;

    Ok(Json(ExtendBookingResponse {
        success: true,
        booking,
        additional_price,
    }))
}

pub async fn pay_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayRequest>,
) -> AppResult<Json<PaymentOrderResponse>> {
    let method = PaymentMethod::from_label(&payload.method).ok_or_else(|| {
        AppError::BadRequest(
            "Choose a valid online method: upi, card, netbanking, or wallet".to_string(),
        )
    })?;

    let (order, booking) = payments::initiate(&state, claims.sub, id, method).await?;

    Ok(Json(PaymentOrderResponse {
        success: true,
        order,
        booking,
    }))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<PaymentConfirmedResponse>> {
    let reference = payload.gateway_payment_id.or(payload.order_id);
    let (booking, payment) =
        payments::confirm(&state, claims.sub, id, payload.payment_id, reference).await?;

    Ok(Json(PaymentConfirmedResponse {
        success: true,
        message: "Payment successful",
        booking,
        payment,
    }))
}

// ============ Reviews & invoices ============

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub booking_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

pub async fn add_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ReviewRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let review = review::submit(
        &state,
        claims.sub,
        payload.booking_id,
        payload.rating,
        payload.comment,
    )
    .await?;

    Ok(Json(ReviewResponse {
        success: true,
        review,
    }))
}

/// Payments belonging to the customer's finished bookings
pub async fn invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<InvoiceListResponse>> {
    let finished = booking::Entity::find()
        .filter(booking::Column::CustomerId.eq(claims.sub))
        .filter(booking::Column::Status.is_in([BookingStatus::Completed, BookingStatus::Cancelled]))
        .all(&state.db)
        .await?;
    let booking_ids: Vec<Uuid> = finished.iter().map(|b| b.id).collect();

    let records = payment::Entity::find()
        .filter(payment::Column::BookingId.is_in(booking_ids))
        .order_by_desc(payment::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let invoices: Vec<Invoice> = records
        .into_iter()
        .map(|payment| {
            let booking = finished.iter().find(|b| b.id == payment.booking_id).cloned();
            Invoice { payment, booking }
        })
        .collect();

    Ok(Json(InvoiceListResponse {
        success: true,
        invoices,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_in(city: &str, types: Vec<VehicleType>) -> driver::Model {
        driver::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            license_number: String::new(),
            license_image: String::new(),
            id_proof_image: String::new(),
            aadhaar_number: String::new(),
            aadhaar_image: String::new(),
            document_status: DocumentStatus::Verified,
            verification_remarks: String::new(),
            verified_at: None,
            experience: 5,
            languages: Languages(vec!["Hindi".to_string()]),
            vehicle_types: VehicleTypes(types),
            city: city.to_string(),
            is_approved: ApprovalStatus::Approved,
            is_online: true,
            rating: 4.5,
            total_reviews: 10,
            total_earnings: 0,
            completed_jobs: 3,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_city_filter_is_case_insensitive_substring() {
        let d = driver_in("Navi Mumbai", vec![VehicleType::Car]);
        let query = SearchQuery {
            city: Some("mumbai".to_string()),
            ..Default::default()
        };
        assert!(matches_search(&d, &query));

        let query = SearchQuery {
            city: Some("Delhi".to_string()),
            ..Default::default()
        };
        assert!(!matches_search(&d, &query));
    }

    #[test]
    fn test_vehicle_type_filter() {
        let d = driver_in("Pune", vec![VehicleType::Bike]);
        let bikes = SearchQuery {
            vehicle_type: Some(VehicleType::Bike),
            ..Default::default()
        };
        let cars = SearchQuery {
            vehicle_type: Some(VehicleType::Car),
            ..Default::default()
        };

        assert!(matches_search(&d, &bikes));
        assert!(!matches_search(&d, &cars));
        assert!(matches_search(&d, &SearchQuery::default()));
    }

    #[test]
    fn test_driver_card_carries_public_fields() {
        let d = driver_in("Pune", vec![VehicleType::Car]);
        let card = DriverCard::new(d.clone(), "Ravi".to_string());

        assert_eq!(card.id, d.id);
        assert_eq!(card.name, "Ravi");
        assert_eq!(card.city, "Pune");
        assert_eq!(card.completed_jobs, 3);
    }

    #[test]
    fn test_profile_update_validation() {
        let ok = UpdateCustomerProfileRequest {
            name: Some("Asha".to_string()),
            avatar: Some("https://cdn.example.com/a.png".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&ok).is_ok());

        let cleared = UpdateCustomerProfileRequest {
            avatar: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_profile_update(&cleared).is_ok());

        let blank_name = UpdateCustomerProfileRequest {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&blank_name).is_err());

        let not_a_url = UpdateCustomerProfileRequest {
            avatar: Some("data:image/png;base64,AAAA".to_string()),
            ..Default::default()
        };
        match validate_profile_update(&not_a_url) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Avatar must be an image URL"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vehicle_year_range() {
        let mut vehicle = VehicleRequest {
            vehicle_type: VehicleType::Car,
            make: "Maruti".to_string(),
            model: "Swift".to_string(),
            year: 2020,
            plate_number: "mh12ab1234".to_string(),
            transmission: Transmission::Manual,
            fuel_type: FuelType::Petrol,
            color: String::new(),
        };
        assert!(validate_vehicle(&vehicle).is_ok());

        vehicle.year = 1989;
        match validate_vehicle(&vehicle) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Year must be between 1990 and 2030"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_payment_method_falls_back_to_cash() {
        let method = Some("bitcoin")
            .and_then(PaymentMethod::from_label)
            .unwrap_or_default();
        assert_eq!(method, PaymentMethod::Cash);
        assert_eq!(PaymentMethod::from_label(" UPI "), Some(PaymentMethod::Upi));
    }
}
