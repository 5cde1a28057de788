//! Monthly pricing and cancellation penalties.
//!
//! Prices are whole rupees. A booking is billed per started 30-day month and
//! scaled by the driver's experience, capped by the admin-configured rule.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::pricing_rule::{self, DurationType};
use crate::entities::vehicle::VehicleType;
use crate::error::{AppError, AppResult};

pub const DAYS_PER_MONTH: i64 = 30;
pub const FALLBACK_CAR_RATE: i64 = 25_000;
pub const FALLBACK_BIKE_RATE: i64 = 12_000;
pub const DEFAULT_PENALTY_PERCENT: f64 = 10.0;
pub const DEFAULT_MULTIPLIER_CAP: f64 = 1.0;
/// Upper bound on a configured monthly base rate
pub const MAX_BASE_RATE: i64 = 10_000_000;
/// Multiplier bump per year of driving experience
pub const EXPERIENCE_STEP: f64 = 0.02;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn div_ceil(value: i64, divisor: i64) -> i64 {
    (value + divisor - 1).div_euclid(divisor)
}

/// Flat monthly rate used while no rule is configured for a vehicle type
pub fn fallback_rate(vehicle_type: VehicleType) -> i64 {
    match vehicle_type {
        VehicleType::Car => FALLBACK_CAR_RATE,
        VehicleType::Bike => FALLBACK_BIKE_RATE,
    }
}

/// Whole days in the window, rounded up
pub fn duration_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    div_ceil((end - start).num_milliseconds(), MILLIS_PER_DAY)
}

/// Months billed for the window. Always rounds up and never bills less than one month.
pub fn billable_months(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    div_ceil(duration_days(start, end), DAYS_PER_MONTH).max(1)
}

pub fn experience_multiplier(experience_years: i32, cap: f64) -> f64 {
    let raw = 1.0 + f64::from(experience_years.max(0)) * EXPERIENCE_STEP;
    raw.min(cap)
}

pub fn compute_price(
    rule: Option<&pricing_rule::Model>,
    vehicle_type: VehicleType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    experience_years: i32,
) -> i64 {
    let months = billable_months(start, end);

    match rule {
        Some(rule) => {
            let multiplier =
                experience_multiplier(experience_years, rule.experience_multiplier_cap);
            let price = (rule.base_rate as f64 * months as f64 * multiplier).round() as i64;
            price.max(0)
        }
        None => fallback_rate(vehicle_type) * months,
    }
}

pub fn compute_cancellation_penalty(rule: Option<&pricing_rule::Model>, total_price: i64) -> i64 {
    let percent = rule
        .map(|r| r.cancellation_penalty_percent)
        .unwrap_or(DEFAULT_PENALTY_PERCENT);

    (total_price as f64 * percent / 100.0).round() as i64
}

/// Sum two money amounts, refusing totals that do not fit
pub fn add_amounts(a: i64, b: i64) -> AppResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| AppError::BadRequest("Amount is too large".to_string()))
}

/// Reject rule values the engine cannot price with
pub fn validate_rule(
    base_rate: i64,
    experience_multiplier_cap: f64,
    cancellation_penalty_percent: f64,
) -> AppResult<()> {
    if base_rate < 0 {
        return Err(AppError::BadRequest(
            "Base rate cannot be negative".to_string(),
        ));
    }

    if base_rate > MAX_BASE_RATE {
        return Err(AppError::BadRequest(format!(
            "Base rate cannot exceed {}",
            MAX_BASE_RATE
        )));
    }

    if !experience_multiplier_cap.is_finite() || experience_multiplier_cap < 1.0 {
        return Err(AppError::BadRequest(
            "Experience multiplier cap must be at least 1.0".to_string(),
        ));
    }

    if !(0.0..=100.0).contains(&cancellation_penalty_percent) {
        return Err(AppError::BadRequest(
            "Cancellation penalty must be between 0 and 100 percent".to_string(),
        ));
    }

    Ok(())
}

pub async fn find_rule<C: ConnectionTrait>(
    db: &C,
    vehicle_type: VehicleType,
    duration_type: DurationType,
) -> AppResult<Option<pricing_rule::Model>> {
    let rule = pricing_rule::Entity::find()
        .filter(pricing_rule::Column::VehicleType.eq(vehicle_type))
        .filter(pricing_rule::Column::DurationType.eq(duration_type))
        .one(db)
        .await?;

    Ok(rule)
}

/// Price a window against the currently configured rule
pub async fn quote_price<C: ConnectionTrait>(
    db: &C,
    vehicle_type: VehicleType,
    duration_type: DurationType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    experience_years: i32,
) -> AppResult<i64> {
    let rule = find_rule(db, vehicle_type, duration_type).await?;
    let price = compute_price(rule.as_ref(), vehicle_type, start, end, experience_years);

    tracing::debug!(
        ?vehicle_type,
        %start,
        %end,
        experience_years,
        configured = rule.is_some(),
        price,
        "Computed price"
    );

    Ok(price)
}

pub async fn quote_cancellation_penalty<C: ConnectionTrait>(
    db: &C,
    vehicle_type: VehicleType,
    duration_type: DurationType,
    total_price: i64,
) -> AppResult<i64> {
    let rule = find_rule(db, vehicle_type, duration_type).await?;
    Ok(compute_cancellation_penalty(rule.as_ref(), total_price))
}
