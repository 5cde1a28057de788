//! Booking lifecycle.
//!
//! ```text
//! pending ──accept──▶ confirmed ──complete──▶ completed
//!    │  └──accept (start passed)──▶ active ──complete──▶ completed
//!    └──────────── cancel (any open state) ──────────▶ cancelled
//! ```
//!
//! Every write that depends on the driver's calendar or aggregates runs in one
//! transaction holding the driver row lock (`SELECT ... FOR UPDATE`), so
//! overlapping creates/extends for the same driver serialize.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::booking::{self, BookingPaymentStatus, BookingStatus, CancelledBy, PaymentMethod};
use crate::entities::driver::{self, ApprovalStatus};
use crate::entities::notification::NotificationKind;
use crate::entities::payment;
use crate::entities::pricing_rule::{self, DurationType};
use crate::entities::vehicle::{self, VehicleType};
use crate::error::{AppError, AppResult};
use crate::services::pricing::DAYS_PER_MONTH;
use crate::services::{availability, payment as payments, pricing};
use crate::AppState;

pub const MIN_BOOKING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Accept,
    Reject,
    DriverCancel,
    CustomerCancel,
    AdminCancel,
    Complete,
    Extend,
}

impl BookingAction {
    pub const ALL: [BookingAction; 7] = [
        BookingAction::Accept,
        BookingAction::Reject,
        BookingAction::DriverCancel,
        BookingAction::CustomerCancel,
        BookingAction::AdminCancel,
        BookingAction::Complete,
        BookingAction::Extend,
    ];
}

/// Status a booking moves to when `action` is applied, or the error the
/// caller should see. Nothing is mutated when this returns an error.
pub fn next_status(
    current: BookingStatus,
    action: BookingAction,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<BookingStatus> {
    use BookingAction as A;
    use BookingStatus as S;

    match (action, current) {
        // A window that has already begun skips `confirmed`
        (A::Accept, S::Pending) if start_time <= now => Ok(S::Active),
        (A::Accept, S::Pending) => Ok(S::Confirmed),
        (A::Reject, S::Pending) => Ok(S::Cancelled),
        (A::Accept | A::Reject, _) => Err(AppError::NotFound(
            "Booking not found or already processed".to_string(),
        )),

        (A::DriverCancel, S::Confirmed | S::Active) => Ok(S::Cancelled),
        (A::Complete, S::Confirmed | S::Active) => Ok(S::Completed),
        (A::DriverCancel | A::Complete, _) => {
            Err(AppError::NotFound("Booking not found".to_string()))
        }

        (A::CustomerCancel, s) if !s.is_terminal() => Ok(S::Cancelled),
        (A::CustomerCancel, _) => {
            Err(AppError::BadRequest("Cannot cancel this booking".to_string()))
        }

        (A::AdminCancel, s) if !s.is_terminal() => Ok(S::Cancelled),
        (A::AdminCancel, s) => Err(AppError::BadRequest(format!(
            "Cannot cancel a {} booking",
            s.as_str()
        ))),

        (A::Extend, S::Confirmed | S::Active) => Ok(current),
        (A::Extend, _) => Err(AppError::NotFound("Active booking not found".to_string())),
    }
}

/// Check a requested window before anything is written
pub fn validate_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if start < now {
        return Err(AppError::BadRequest(
            "Start date cannot be in the past".to_string(),
        ));
    }

    if end - start < Duration::days(MIN_BOOKING_DAYS) {
        return Err(AppError::BadRequest(
            "Minimum booking duration is 1 month (30 days)".to_string(),
        ));
    }

    Ok(())
}

/// New end date after adding `extra_months` thirty-day months
pub fn extension_end(end: DateTime<Utc>, extra_months: i64) -> AppResult<DateTime<Utc>> {
    if extra_months < 1 {
        return Err(AppError::BadRequest(
            "Specify at least 1 extra month".to_string(),
        ));
    }

    extra_months
        .checked_mul(DAYS_PER_MONTH)
        .and_then(Duration::try_days)
        .and_then(|extra| end.checked_add_signed(extra))
        .ok_or_else(|| AppError::BadRequest("Extension is too long".to_string()))
}

pub fn reason_or(reason: Option<String>, default: &str) -> String {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub pickup_location: String,
    pub notes: String,
    pub payment_method: PaymentMethod,
}

/// Who is asking for a booking; bookings outside the scope look missing.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Customer(Uuid),
    Driver(Uuid),
    Admin,
}

async fn lock_driver<C: ConnectionTrait>(db: &C, driver_id: Uuid) -> AppResult<Option<driver::Model>> {
    let driver = driver::Entity::find_by_id(driver_id)
        .lock_exclusive()
        .one(db)
        .await?;

    Ok(driver)
}

/// Load a booking within `scope` and lock its driver, re-reading the booking
/// once the lock is held so status checks see the latest committed state.
async fn lock_booking(
    txn: &DatabaseTransaction,
    booking_id: Uuid,
    scope: Scope,
    not_found: &str,
) -> AppResult<(driver::Model, booking::Model)> {
    let mut query = booking::Entity::find_by_id(booking_id);
    query = match scope {
        Scope::Customer(id) => query.filter(booking::Column::CustomerId.eq(id)),
        Scope::Driver(id) => query.filter(booking::Column::DriverId.eq(id)),
        Scope::Admin => query,
    };

    let peeked = query
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(not_found.to_string()))?;

    let driver = lock_driver(txn, peeked.driver_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Driver {} missing for booking", peeked.driver_id)))?;

    let booking = booking::Entity::find_by_id(booking_id)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(not_found.to_string()))?;

    Ok((driver, booking))
}

async fn vehicle_type_of<C: ConnectionTrait>(db: &C, vehicle_id: Uuid) -> AppResult<VehicleType> {
    let vehicle = vehicle::Entity::find_by_id(vehicle_id).one(db).await?;
    Ok(vehicle.map(|v| v.vehicle_type).unwrap_or(VehicleType::Car))
}

/// Writes that cancel a booking: the booking row and, when the customer had
/// paid, the refunded payment.
#[derive(Debug)]
pub struct Cancellation {
    pub booking: booking::ActiveModel,
    pub refund: Option<payment::ActiveModel>,
}

/// Decide a cancellation. `penalty` is kept from a completed payment; the
/// rest goes back to the customer.
pub fn plan_cancellation(
    booking: booking::Model,
    action: BookingAction,
    reason: String,
    penalty: i64,
    paid: Option<payment::Model>,
    now: DateTime<Utc>,
) -> AppResult<Cancellation> {
    let status = next_status(
        booking.status,
        action,
        booking.start_time.with_timezone(&Utc),
        now,
    )?;

    let by = match action {
        BookingAction::CustomerCancel => CancelledBy::Customer,
        BookingAction::AdminCancel => CancelledBy::Admin,
        _ => CancelledBy::Driver,
    };

    let refund = paid.map(|p| payments::refund(p, penalty, now));

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    active.cancelled_by = Set(Some(by));
    active.cancellation_reason = Set(reason);
    active.cancellation_penalty = Set(penalty);
    if refund.is_some() {
        active.payment_status = Set(BookingPaymentStatus::Refunded);
    }
    active.updated_at = Set(now.into());

    Ok(Cancellation {
        booking: active,
        refund,
    })
}

/// Writes that finish a job
#[derive(Debug)]
pub struct Completion {
    pub booking: booking::ActiveModel,
    pub driver: driver::ActiveModel,
    pub settlement: Option<payment::ActiveModel>,
}

/// Decide a completion. A job without a completed payment is settled for its
/// full price and the driver is credited either way.
pub fn plan_completion(
    booking: booking::Model,
    driver: driver::Model,
    already_paid: bool,
    now: DateTime<Utc>,
) -> AppResult<Completion> {
    let status = next_status(
        booking.status,
        BookingAction::Complete,
        booking.start_time.with_timezone(&Utc),
        now,
    )?;

    let total_earnings = pricing::add_amounts(driver.total_earnings, booking.total_price)?;
    let completed_jobs = driver.completed_jobs.saturating_add(1);
    let settlement = (!already_paid).then(|| payments::settlement(&booking, now));

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    if settlement.is_some() {
        active.payment_status = Set(BookingPaymentStatus::Paid);
    }
    active.updated_at = Set(now.into());

    let mut credited: driver::ActiveModel = driver.into();
    credited.completed_jobs = Set(completed_jobs);
    credited.total_earnings = Set(total_earnings);

    Ok(Completion {
        booking: active,
        driver: credited,
        settlement,
    })
}

/// Decide a new booking from what the transaction has loaded. `calendar` holds
/// the driver's open bookings around the requested window.
pub fn plan_booking(
    customer_id: Uuid,
    request: NewBooking,
    vehicle: &vehicle::Model,
    driver: &driver::Model,
    calendar: &[booking::Model],
    rule: Option<&pricing_rule::Model>,
    now: DateTime<Utc>,
) -> AppResult<booking::ActiveModel> {
    if driver.is_approved != ApprovalStatus::Approved {
        return Err(AppError::BadRequest("Driver not available".to_string()));
    }

    if !availability::check_free(calendar, request.start_time, request.end_time, None) {
        return Err(AppError::BadRequest(
            "Driver is already booked for this time period".to_string(),
        ));
    }

    let total_price = pricing::compute_price(
        rule,
        vehicle.vehicle_type,
        request.start_time,
        request.end_time,
        driver.experience,
    );

    Ok(booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        driver_id: Set(driver.id),
        vehicle_id: Set(vehicle.id),
        start_time: Set(request.start_time.into()),
        end_time: Set(request.end_time.into()),
        duration_type: Set(DurationType::Monthly),
        status: Set(BookingStatus::Pending),
        total_price: Set(total_price),
        pickup_location: Set(request.pickup_location.trim().to_string()),
        notes: Set(request.notes),
        payment_method: Set(request.payment_method),
        payment_status: Set(BookingPaymentStatus::Unpaid),
        cancellation_reason: Set(String::new()),
        cancelled_by: Set(None),
        cancellation_penalty: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
}

/// Extended booking and the price of the added months
#[derive(Debug)]
pub struct Extension {
    pub booking: booking::ActiveModel,
    pub new_end: DateTime<Utc>,
    pub additional_price: i64,
}

/// Decide an extension. Only `[old_end, new_end)` is checked against the
/// calendar and priced.
pub fn plan_extension(
    booking: booking::Model,
    experience_years: i32,
    vehicle_type: VehicleType,
    extra_months: i64,
    calendar: &[booking::Model],
    rule: Option<&pricing_rule::Model>,
    now: DateTime<Utc>,
) -> AppResult<Extension> {
    next_status(
        booking.status,
        BookingAction::Extend,
        booking.start_time.with_timezone(&Utc),
        now,
    )?;

    let old_end = booking.end_time.with_timezone(&Utc);
    let new_end = extension_end(old_end, extra_months)?;

    if !availability::check_free(calendar, old_end, new_end, Some(booking.id)) {
        return Err(AppError::BadRequest(
            "Driver has another booking in the extended period".to_string(),
        ));
    }

    let additional_price =
        pricing::compute_price(rule, vehicle_type, old_end, new_end, experience_years);
    let total_price = pricing::add_amounts(booking.total_price, additional_price)?;

    let mut active: booking::ActiveModel = booking.into();
    active.end_time = Set(new_end.into());
    active.total_price = Set(total_price);
    active.updated_at = Set(now.into());

    Ok(Extension {
        booking: active,
        new_end,
        additional_price,
    })
}

/// Persist a cancellation inside the caller's transaction
async fn apply_cancellation(
    txn: &DatabaseTransaction,
    plan: Cancellation,
) -> AppResult<(booking::Model, Option<payment::Model>)> {
    let refunded = match plan.refund {
        Some(refund) => Some(refund.update(txn).await?),
        None => None,
    };
    let booking = plan.booking.update(txn).await?;

    Ok((booking, refunded))
}

/// Customer books a driver. Nothing is stored unless every precondition holds.
pub async fn create(
    state: &AppState,
    customer_id: Uuid,
    request: NewBooking,
) -> AppResult<booking::Model> {
    let now = Utc::now();
    validate_window(request.start_time, request.end_time, now)?;

    if request.pickup_location.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Pickup location is required".to_string(),
        ));
    }

    let txn = state.db.begin().await?;

    let vehicle = vehicle::Entity::find_by_id(request.vehicle_id)
        .filter(vehicle::Column::OwnerId.eq(customer_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    let driver = lock_driver(&txn, request.driver_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Driver not available".to_string()))?;

    let calendar =
        availability::open_bookings_in(&txn, driver.id, request.start_time, request.end_time).await?;
    let rule = pricing::find_rule(&txn, vehicle.vehicle_type, DurationType::Monthly).await?;

    let booking = plan_booking(
        customer_id,
        request,
        &vehicle,
        &driver,
        &calendar,
        rule.as_ref(),
        now,
    )?
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        %customer_id,
        driver_id = %driver.id,
        total_price = booking.total_price,
        rule_configured = rule.is_some(),
        "Booking created"
    );

    state.notifier.notify(
        driver.user_id,
        NotificationKind::BookingNew,
        "New Booking Request",
        format!(
            "You have a new monthly booking request worth ₹{}. Check your job requests!",
            booking.total_price
        ),
        "/driver/jobs",
    );

    Ok(booking)
}

/// Driver accepts a pending request
pub async fn accept(state: &AppState, driver_id: Uuid, booking_id: Uuid) -> AppResult<booking::Model> {
    let txn = state.db.begin().await?;
    let (_, booking) = lock_booking(
        &txn,
        booking_id,
        Scope::Driver(driver_id),
        "Booking not found or already processed",
    )
    .await?;

    let now = Utc::now();
    let status = next_status(
        booking.status,
        BookingAction::Accept,
        booking.start_time.with_timezone(&Utc),
        now,
    )?;

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(status);
    active.updated_at = Set(now.into());
    let booking = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "Booking accepted");

    let detail = if status == BookingStatus::Active {
        "The job is now active!"
    } else {
        "It will start on the scheduled date."
    };
    state.notifier.notify(
        booking.customer_id,
        NotificationKind::BookingAccepted,
        "Booking Confirmed!",
        format!("Your driver has accepted the booking. {}", detail),
        "/customer/bookings",
    );

    Ok(booking)
}

/// Driver declines a pending request. No penalty applies.
pub async fn reject(
    state: &AppState,
    driver_id: Uuid,
    booking_id: Uuid,
    reason: Option<String>,
) -> AppResult<booking::Model> {
    let txn = state.db.begin().await?;
    let (_, booking) = lock_booking(
        &txn,
        booking_id,
        Scope::Driver(driver_id),
        "Booking not found or already processed",
    )
    .await?;

    let paid = payments::completed_payment(&txn, booking.id).await?;
    let reason = reason_or(reason, "Rejected by driver");
    let plan = plan_cancellation(booking, BookingAction::Reject, reason, 0, paid, Utc::now())?;
    let (booking, refunded) = apply_cancellation(&txn, plan).await?;

    txn.commit().await?;

    if let Some(payment) = &refunded {
        tracing::warn!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            "Driver rejected a paid booking, refunding in full"
        );
    }
    tracing::info!(booking_id = %booking.id, "Booking rejected by driver");

    state.notifier.notify(
        booking.customer_id,
        NotificationKind::BookingRejected,
        "Booking Declined",
        "A driver has declined your booking request. You can search for another driver.",
        "/customer/search",
    );

    Ok(booking)
}

/// Driver withdraws from a confirmed or active booking
pub async fn driver_cancel(
    state: &AppState,
    driver_id: Uuid,
    booking_id: Uuid,
    reason: Option<String>,
) -> AppResult<booking::Model> {
    let txn = state.db.begin().await?;
    let (_, booking) = lock_booking(&txn, booking_id, Scope::Driver(driver_id), "Booking not found").await?;

    // The customer is not at fault: any completed payment comes back in full
    let paid = payments::completed_payment(&txn, booking.id).await?;
    let reason = reason_or(reason, "Cancelled by driver");
    let plan = plan_cancellation(booking, BookingAction::DriverCancel, reason, 0, paid, Utc::now())?;
    let (booking, refunded) = apply_cancellation(&txn, plan).await?;

    txn.commit().await?;

    if let Some(payment) = &refunded {
        tracing::warn!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            "Driver cancelled a paid booking, refunding in full"
        );
    }
    tracing::info!(booking_id = %booking.id, "Booking cancelled by driver");

    state.notifier.notify(
        booking.customer_id,
        NotificationKind::BookingCancelled,
        "Booking Cancelled",
        format!(
            "Your driver has cancelled the booking. Reason: {}",
            booking.cancellation_reason
        ),
        "/customer/bookings",
    );

    Ok(booking)
}

/// Customer cancels; the configured penalty is kept from any completed payment
pub async fn customer_cancel(
    state: &AppState,
    customer_id: Uuid,
    booking_id: Uuid,
    reason: Option<String>,
) -> AppResult<(booking::Model, Option<payment::Model>)> {
    let txn = state.db.begin().await?;
    let (driver, booking) =
        lock_booking(&txn, booking_id, Scope::Customer(customer_id), "Booking not found").await?;

    let now = Utc::now();
    next_status(
        booking.status,
        BookingAction::CustomerCancel,
        booking.start_time.with_timezone(&Utc),
        now,
    )?;

    let vehicle_type = vehicle_type_of(&txn, booking.vehicle_id).await?;
    let penalty = pricing::quote_cancellation_penalty(
        &txn,
        vehicle_type,
        booking.duration_type,
        booking.total_price,
    )
    .await?;

    let paid = payments::completed_payment(&txn, booking.id).await?;
    let reason = reason_or(reason, "Cancelled by customer");
    let plan = plan_cancellation(booking, BookingAction::CustomerCancel, reason, penalty, paid, now)?;
    let (booking, refunded) = apply_cancellation(&txn, plan).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        penalty,
        refund = refunded.as_ref().map(|p| p.refund_amount),
        "Booking cancelled by customer"
    );

    state.notifier.notify(
        driver.user_id,
        NotificationKind::BookingCancelled,
        "Booking Cancelled",
        format!(
            "The customer has cancelled the booking. Reason: {}",
            booking.cancellation_reason
        ),
        "/driver/jobs",
    );

    Ok((booking, refunded))
}

/// Administrative override. No penalty; completed payments are refunded in full.
pub async fn admin_cancel(
    state: &AppState,
    booking_id: Uuid,
    reason: Option<String>,
) -> AppResult<booking::Model> {
    let txn = state.db.begin().await?;
    let (driver, booking) = lock_booking(&txn, booking_id, Scope::Admin, "Booking not found").await?;

    let paid = payments::completed_payment(&txn, booking.id).await?;
    let reason = reason_or(reason, "Cancelled by admin");
    let plan = plan_cancellation(booking, BookingAction::AdminCancel, reason, 0, paid, Utc::now())?;
    let (booking, refunded) = apply_cancellation(&txn, plan).await?;

    txn.commit().await?;

    if refunded.is_some() {
        tracing::warn!(booking_id = %booking.id, "Admin cancelled a paid booking, refunding in full");
    }
    tracing::info!(booking_id = %booking.id, "Booking cancelled by admin");

    let message = format!(
        "Your booking was cancelled by the admin. Reason: {}",
        booking.cancellation_reason
    );
    state.notifier.notify(
        booking.customer_id,
        NotificationKind::BookingCancelled,
        "Booking Cancelled by Admin",
        message,
        "/customer/bookings",
    );
    state.notifier.notify(
        driver.user_id,
        NotificationKind::BookingCancelled,
        "Booking Cancelled by Admin",
        format!(
            "A booking was cancelled by the admin. Reason: {}",
            booking.cancellation_reason
        ),
        "/driver/jobs",
    );

    Ok(booking)
}

/// Driver finishes a job: settle payment and credit the driver
pub async fn complete(state: &AppState, driver_id: Uuid, booking_id: Uuid) -> AppResult<booking::Model> {
    let txn = state.db.begin().await?;
    let (driver, booking) = lock_booking(&txn, booking_id, Scope::Driver(driver_id), "Booking not found").await?;

    let already_paid = payments::completed_payment(&txn, booking.id).await?.is_some();
    let plan = plan_completion(booking, driver, already_paid, Utc::now())?;

    let settled = match plan.settlement {
        Some(record) => Some(record.insert(&txn).await?),
        None => None,
    };
    let booking = plan.booking.update(&txn).await?;
    plan.driver.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        %driver_id,
        total_price = booking.total_price,
        settled_on_completion = settled.is_some(),
        "Booking completed"
    );

    state.notifier.notify(
        booking.customer_id,
        NotificationKind::BookingCompleted,
        "Job Completed!",
        format!(
            "Your booking has been completed. Total: ₹{}. Please leave a review!",
            booking.total_price
        ),
        "/customer/bookings",
    );

    Ok(booking)
}

/// Customer extends a running booking. Only the added months are priced.
pub async fn extend(
    state: &AppState,
    customer_id: Uuid,
    booking_id: Uuid,
    extra_months: i64,
) -> AppResult<(booking::Model, i64)> {
    if extra_months < 1 {
        return Err(AppError::BadRequest(
            "Specify at least 1 extra month".to_string(),
        ));
    }

    let txn = state.db.begin().await?;
    let (driver, booking) = lock_booking(
        &txn,
        booking_id,
        Scope::Customer(customer_id),
        "Active booking not found",
    )
    .await?;

    next_status(
        booking.status,
        BookingAction::Extend,
        booking.start_time.with_timezone(&Utc),
        Utc::now(),
    )?;

    let old_end = booking.end_time.with_timezone(&Utc);
    let new_end = extension_end(old_end, extra_months)?;
    let calendar = availability::open_bookings_in(&txn, driver.id, old_end, new_end).await?;
    let vehicle_type = vehicle_type_of(&txn, booking.vehicle_id).await?;
    let rule = pricing::find_rule(&txn, vehicle_type, booking.duration_type).await?;

    let plan = plan_extension(
        booking,
        driver.experience,
        vehicle_type,
        extra_months,
        &calendar,
        rule.as_ref(),
        Utc::now(),
    )?;
    let additional_price = plan.additional_price;
    let booking = plan.booking.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        extra_months,
        additional_price,
        total_price = booking.total_price,
        "Booking extended"
    );

    state.notifier.notify(
        driver.user_id,
        NotificationKind::BookingActive,
        "Booking Extended",
        format!(
            "Your current booking has been extended by {} month(s). New end date: {}.",
            extra_months,
            plan.new_end.format("%d %b %Y")
        ),
        "/driver/jobs",
    );

    Ok((booking, additional_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, month, day, 9, 0, 0).unwrap()
    }

    fn car_rule() -> pricing_rule::Model {
        let now = at(1, 1).into();
        pricing_rule::Model {
            id: Uuid::new_v4(),
            vehicle_type: VehicleType::Car,
            duration_type: DurationType::Monthly,
            base_rate: 20_000,
            experience_multiplier_cap: 1.5,
            cancellation_penalty_percent: 10.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn approved_driver() -> driver::Model {
        driver::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            license_number: "KA0120230001234".to_string(),
            license_image: "/uploads/license.png".to_string(),
            id_proof_image: String::new(),
            aadhaar_number: "123456789012".to_string(),
            aadhaar_image: "/uploads/aadhaar.png".to_string(),
            document_status: driver::DocumentStatus::Verified,
            verification_remarks: String::new(),
            verified_at: None,
            experience: 5,
            languages: driver::Languages(vec!["Hindi".to_string()]),
            vehicle_types: driver::VehicleTypes(vec![VehicleType::Car]),
            city: "Bengaluru".to_string(),
            is_approved: ApprovalStatus::Approved,
            is_online: true,
            rating: 4.5,
            total_reviews: 2,
            total_earnings: 100_000,
            completed_jobs: 3,
            created_at: at(1, 1).into(),
        }
    }

    fn car(owner_id: Uuid) -> vehicle::Model {
        vehicle::Model {
            id: Uuid::new_v4(),
            owner_id,
            vehicle_type: VehicleType::Car,
            make: "Maruti".to_string(),
            model: "Swift".to_string(),
            year: 2022,
            plate_number: "KA01AB1234".to_string(),
            transmission: vehicle::Transmission::Manual,
            fuel_type: vehicle::FuelType::Petrol,
            color: "White".to_string(),
            created_at: at(1, 1).into(),
        }
    }

    fn booking_for(
        driver: &driver::Model,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: BookingStatus,
    ) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: driver.id,
            vehicle_id: Uuid::new_v4(),
            start_time: start.into(),
            end_time: end.into(),
            duration_type: DurationType::Monthly,
            status,
            total_price: 22_000,
            pickup_location: "MG Road".to_string(),
            notes: String::new(),
            payment_method: PaymentMethod::Upi,
            payment_status: BookingPaymentStatus::Unpaid,
            cancellation_reason: String::new(),
            cancelled_by: None,
            cancellation_penalty: 0,
            created_at: at(1, 1).into(),
            updated_at: at(1, 1).into(),
        }
    }

    fn completed_payment_for(booking: &booking::Model) -> payment::Model {
        payment::Model {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            customer_id: booking.customer_id,
            amount: booking.total_price,
            method: booking.payment_method,
            status: payment::PaymentStatus::Completed,
            transaction_id: "TXN1ABCDEF".to_string(),
            refund_amount: 0,
            created_at: at(1, 2).into(),
            updated_at: at(1, 2).into(),
        }
    }

    fn request(driver: &driver::Model, vehicle: &vehicle::Model, start: DateTime<Utc>, end: DateTime<Utc>) -> NewBooking {
        NewBooking {
            driver_id: driver.id,
            vehicle_id: vehicle.id,
            start_time: start,
            end_time: end,
            pickup_location: "  Indiranagar  ".to_string(),
            notes: "Office commute".to_string(),
            payment_method: PaymentMethod::Cash,
        }
    }

    fn reachable_from(status: BookingStatus, start: DateTime<Utc>, now: DateTime<Utc>) -> HashSet<BookingStatus> {
        BookingAction::ALL
            .iter()
            .filter_map(|action| next_status(status, *action, start, now).ok())
            .filter(|next| *next != status)
            .collect()
    }

    #[test]
    fn test_accept_before_start_confirms() {
        let status = next_status(BookingStatus::Pending, BookingAction::Accept, at(2, 1), at(1, 1));
        assert_eq!(status.unwrap(), BookingStatus::Confirmed);
    }

    #[test]
    fn test_accept_after_start_activates() {
        let status = next_status(BookingStatus::Pending, BookingAction::Accept, at(1, 1), at(1, 5));
        assert_eq!(status.unwrap(), BookingStatus::Active);

        let status = next_status(BookingStatus::Pending, BookingAction::Accept, at(1, 1), at(1, 1));
        assert_eq!(status.unwrap(), BookingStatus::Active);
    }

    #[test]
    fn test_pending_cannot_complete() {
        let reachable = reachable_from(BookingStatus::Pending, at(2, 1), at(1, 1));
        let allowed: HashSet<_> = [
            BookingStatus::Confirmed,
            BookingStatus::Active,
            BookingStatus::Cancelled,
        ]
        .into_iter()
        .collect();

        assert!(reachable.is_subset(&allowed));
        assert!(!reachable.contains(&BookingStatus::Completed));
        assert!(matches!(
            next_status(BookingStatus::Pending, BookingAction::Complete, at(2, 1), at(1, 1)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_terminal_states_reject_every_action() {
        for terminal in [BookingStatus::Completed, BookingStatus::Cancelled] {
            for action in BookingAction::ALL {
                assert!(
                    next_status(terminal, action, at(1, 1), at(3, 1)).is_err(),
                    "{:?} should not apply to {:?}",
                    action,
                    terminal
                );
            }
        }
    }

    #[test]
    fn test_terminal_cancel_messages() {
        match next_status(BookingStatus::Completed, BookingAction::AdminCancel, at(1, 1), at(3, 1)) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cannot cancel a completed booking"),
            other => panic!("unexpected {:?}", other),
        }

        match next_status(BookingStatus::Cancelled, BookingAction::CustomerCancel, at(1, 1), at(3, 1)) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cannot cancel this booking"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_driver_actions_need_commitment() {
        for action in [BookingAction::DriverCancel, BookingAction::Complete, BookingAction::Extend] {
            assert!(next_status(BookingStatus::Pending, action, at(2, 1), at(1, 1)).is_err());
        }

        for status in [BookingStatus::Confirmed, BookingStatus::Active] {
            assert_eq!(
                next_status(status, BookingAction::Complete, at(1, 1), at(2, 1)).unwrap(),
                BookingStatus::Completed
            );
            assert_eq!(
                next_status(status, BookingAction::DriverCancel, at(1, 1), at(2, 1)).unwrap(),
                BookingStatus::Cancelled
            );
            assert_eq!(
                next_status(status, BookingAction::Extend, at(1, 1), at(2, 1)).unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_reject_only_while_pending() {
        assert_eq!(
            next_status(BookingStatus::Pending, BookingAction::Reject, at(2, 1), at(1, 1)).unwrap(),
            BookingStatus::Cancelled
        );
        assert!(next_status(BookingStatus::Confirmed, BookingAction::Reject, at(2, 1), at(1, 1)).is_err());
    }

    #[test]
    fn test_window_validation() {
        let now = at(1, 1);

        assert!(validate_window(at(1, 2), at(1, 2) + Duration::days(30), now).is_ok());

        match validate_window(now - Duration::hours(1), at(3, 1), now) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Start date cannot be in the past"),
            other => panic!("unexpected {:?}", other),
        }

        match validate_window(at(1, 2), at(1, 2) + Duration::days(29), now) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Minimum booking duration is 1 month (30 days)")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extension_adds_thirty_day_months() {
        let end = at(2, 1);
        assert_eq!(extension_end(end, 1).unwrap(), end + Duration::days(30));
        assert_eq!(extension_end(end, 3).unwrap(), end + Duration::days(90));
        assert!(extension_end(end, 0).is_err());
        assert!(extension_end(end, -2).is_err());
        assert!(extension_end(end, i64::MAX).is_err());
    }

    #[test]
    fn test_extension_price_is_incremental() {
        let rule = car_rule();

        let start = at(1, 1);
        let end = start + Duration::days(30);
        let initial = pricing::compute_price(Some(&rule), VehicleType::Car, start, end, 5);
        assert_eq!(initial, 22_000);

        let new_end = extension_end(end, 2).unwrap();
        let added = pricing::compute_price(Some(&rule), VehicleType::Car, end, new_end, 5);
        assert_eq!(added, 44_000);
        assert_eq!(initial + added, 66_000);
    }

    #[test]
    fn test_reason_defaults() {
        assert_eq!(reason_or(None, "Rejected by driver"), "Rejected by driver");
        assert_eq!(reason_or(Some("   ".to_string()), "Cancelled by admin"), "Cancelled by admin");
        assert_eq!(reason_or(Some(" Car sold ".to_string()), "x"), "Car sold");
    }

    #[test]
    fn test_new_booking_is_priced_and_pending() {
        let driver = approved_driver();
        let customer_id = Uuid::new_v4();
        let vehicle = car(customer_id);
        let start = at(2, 1);
        let end = start + Duration::days(30);

        let planned = plan_booking(
            customer_id,
            request(&driver, &vehicle, start, end),
            &vehicle,
            &driver,
            &[],
            Some(&car_rule()),
            at(1, 1),
        )
        .unwrap();

        assert_eq!(planned.total_price.clone().unwrap(), 22_000);
        assert_eq!(planned.status.clone().unwrap(), BookingStatus::Pending);
        assert_eq!(planned.payment_status.clone().unwrap(), BookingPaymentStatus::Unpaid);
        assert_eq!(planned.pickup_location.clone().unwrap(), "Indiranagar");
        assert_eq!(planned.driver_id.clone().unwrap(), driver.id);
    }

    #[test]
    fn test_conflicting_booking_is_refused_before_any_write() {
        let driver = approved_driver();
        let customer_id = Uuid::new_v4();
        let vehicle = car(customer_id);
        let calendar = vec![booking_for(&driver, at(1, 1), at(2, 1), BookingStatus::Confirmed)];

        let planned = plan_booking(
            customer_id,
            request(&driver, &vehicle, at(1, 15), at(2, 15)),
            &vehicle,
            &driver,
            &calendar,
            Some(&car_rule()),
            at(1, 1),
        );

        match planned {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Driver is already booked for this time period")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unapproved_driver_cannot_be_booked() {
        let mut driver = approved_driver();
        driver.is_approved = ApprovalStatus::Pending;
        let customer_id = Uuid::new_v4();
        let vehicle = car(customer_id);

        let planned = plan_booking(
            customer_id,
            request(&driver, &vehicle, at(2, 1), at(3, 5)),
            &vehicle,
            &driver,
            &[],
            None,
            at(1, 1),
        );

        assert!(matches!(planned, Err(AppError::BadRequest(msg)) if msg == "Driver not available"));
    }

    #[test]
    fn test_completion_settles_and_credits_driver() {
        let driver = approved_driver();
        let booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Confirmed);

        let plan = plan_completion(booking.clone(), driver, false, at(3, 3)).unwrap();

        assert_eq!(plan.booking.status.clone().unwrap(), BookingStatus::Completed);
        assert_eq!(plan.booking.payment_status.clone().unwrap(), BookingPaymentStatus::Paid);

        let settlement = plan.settlement.expect("unpaid job is settled");
        assert_eq!(settlement.amount.clone().unwrap(), 22_000);
        assert_eq!(settlement.status.clone().unwrap(), payment::PaymentStatus::Completed);
        assert_eq!(settlement.booking_id.clone().unwrap(), booking.id);

        assert_eq!(plan.driver.completed_jobs.clone().unwrap(), 4);
        assert_eq!(plan.driver.total_earnings.clone().unwrap(), 122_000);
    }

    #[test]
    fn test_completion_of_paid_job_adds_no_payment() {
        let driver = approved_driver();
        let mut booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Active);
        booking.payment_status = BookingPaymentStatus::Paid;

        let plan = plan_completion(booking, driver, true, at(3, 3)).unwrap();

        assert!(plan.settlement.is_none());
        assert_eq!(plan.booking.payment_status.clone().unwrap(), BookingPaymentStatus::Paid);
        assert_eq!(plan.driver.completed_jobs.clone().unwrap(), 4);
    }

    #[test]
    fn test_completion_refuses_pending_and_finished_jobs() {
        for status in [BookingStatus::Pending, BookingStatus::Completed, BookingStatus::Cancelled] {
            let driver = approved_driver();
            let booking = booking_for(&driver, at(2, 1), at(3, 3), status);
            assert!(plan_completion(booking, driver, false, at(3, 3)).is_err());
        }
    }

    #[test]
    fn test_completion_refuses_earnings_overflow() {
        let mut driver = approved_driver();
        driver.total_earnings = i64::MAX;
        let booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Active);

        assert!(matches!(
            plan_completion(booking, driver, false, at(3, 3)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_customer_cancel_refunds_all_but_penalty() {
        let driver = approved_driver();
        let mut booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Confirmed);
        booking.payment_status = BookingPaymentStatus::Paid;
        let paid = completed_payment_for(&booking);

        let plan = plan_cancellation(
            booking,
            BookingAction::CustomerCancel,
            "Plans changed".to_string(),
            2_200,
            Some(paid.clone()),
            at(1, 20),
        )
        .unwrap();

        assert_eq!(plan.booking.status.clone().unwrap(), BookingStatus::Cancelled);
        assert_eq!(plan.booking.cancelled_by.clone().unwrap(), Some(CancelledBy::Customer));
        assert_eq!(plan.booking.cancellation_penalty.clone().unwrap(), 2_200);
        assert_eq!(plan.booking.payment_status.clone().unwrap(), BookingPaymentStatus::Refunded);

        let refund = plan.refund.expect("completed payment is refunded");
        assert_eq!(refund.id.clone().unwrap(), paid.id);
        assert_eq!(refund.status.clone().unwrap(), payment::PaymentStatus::Refunded);
        assert_eq!(refund.refund_amount.clone().unwrap(), 19_800);
    }

    #[test]
    fn test_unpaid_cancel_leaves_payment_status() {
        let driver = approved_driver();
        let booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Pending);

        let plan = plan_cancellation(
            booking,
            BookingAction::CustomerCancel,
            "Cancelled by customer".to_string(),
            2_200,
            None,
            at(1, 20),
        )
        .unwrap();

        assert!(plan.refund.is_none());
        assert_eq!(plan.booking.payment_status.clone().unwrap(), BookingPaymentStatus::Unpaid);
    }

    #[test]
    fn test_driver_side_cancellations_refund_in_full() {
        let driver = approved_driver();

        let pending = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Pending);
        let confirmed = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Confirmed);
        let cases = [
            (pending, BookingAction::Reject, CancelledBy::Driver),
            (confirmed.clone(), BookingAction::DriverCancel, CancelledBy::Driver),
            (confirmed, BookingAction::AdminCancel, CancelledBy::Admin),
        ];

        for (booking, action, by) in cases {
            let paid = completed_payment_for(&booking);
            let plan = plan_cancellation(booking, action, "x".to_string(), 0, Some(paid), at(1, 20)).unwrap();

            assert_eq!(plan.booking.cancelled_by.clone().unwrap(), Some(by));
            assert_eq!(plan.booking.cancellation_penalty.clone().unwrap(), 0);
            assert_eq!(plan.refund.unwrap().refund_amount.clone().unwrap(), 22_000);
        }
    }

    #[test]
    fn test_cancelling_twice_is_refused() {
        let driver = approved_driver();
        let booking = booking_for(&driver, at(2, 1), at(3, 3), BookingStatus::Cancelled);

        let plan = plan_cancellation(booking, BookingAction::AdminCancel, "x".to_string(), 0, None, at(1, 20));
        assert!(matches!(plan, Err(AppError::BadRequest(msg)) if msg == "Cannot cancel a cancelled booking"));
    }

    #[test]
    fn test_extension_prices_only_added_months() {
        let driver = approved_driver();
        let start = at(1, 1);
        let booking = booking_for(&driver, start, start + Duration::days(30), BookingStatus::Active);
        let calendar = vec![booking.clone()];

        let plan = plan_extension(
            booking,
            driver.experience,
            VehicleType::Car,
            2,
            &calendar,
            Some(&car_rule()),
            at(1, 10),
        )
        .unwrap();

        assert_eq!(plan.additional_price, 44_000);
        assert_eq!(plan.booking.total_price.clone().unwrap(), 66_000);
        assert_eq!(plan.new_end, start + Duration::days(90));
    }

    #[test]
    fn test_extension_blocked_by_next_booking() {
        let driver = approved_driver();
        let start = at(1, 1);
        let booking = booking_for(&driver, start, start + Duration::days(30), BookingStatus::Active);
        let next = booking_for(&driver, at(2, 10), at(3, 20), BookingStatus::Pending);
        let calendar = vec![booking.clone(), next];

        let plan = plan_extension(booking, 5, VehicleType::Car, 1, &calendar, None, at(1, 10));
        assert!(matches!(
            plan,
            Err(AppError::BadRequest(msg)) if msg == "Driver has another booking in the extended period"
        ));
    }
}
