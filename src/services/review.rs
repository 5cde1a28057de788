use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver;
use crate::entities::notification::NotificationKind;
use crate::entities::review;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub const MAX_COMMENT_CHARS: usize = 500;

/// Fold one more rating into an average over `count` ratings
pub fn running_average(current: f64, count: i32, rating: i32) -> f64 {
    current + (f64::from(rating) - current) / f64::from(count + 1)
}

pub fn validate_review(rating: i32, comment: &str) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    Ok(())
}

pub async fn submit(
    state: &AppState,
    customer_id: Uuid,
    booking_id: Uuid,
    rating: i32,
    comment: String,
) -> AppResult<review::Model> {
    let comment = comment.trim().to_string();
    validate_review(rating, &comment)?;

    let txn = state.db.begin().await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .filter(booking::Column::CustomerId.eq(customer_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.status != BookingStatus::Completed {
        return Err(AppError::BadRequest(
            "Can only review completed bookings".to_string(),
        ));
    }

    // Serializes rating updates for this driver
    let driver = driver::Entity::find_by_id(booking.driver_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    let existing = review::Entity::find()
        .filter(review::Column::BookingId.eq(booking.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Already reviewed".to_string()));
    }

    let review = review::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        customer_id: Set(customer_id),
        driver_id: Set(driver.id),
        rating: Set(rating),
        comment: Set(comment),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let new_rating = running_average(driver.rating, driver.total_reviews, rating);
    let total_reviews = driver.total_reviews + 1;
    let user_id = driver.user_id;
    let driver_id = driver.id;

    let mut active: driver::ActiveModel = driver.into();
    active.rating = Set(new_rating);
    active.total_reviews = Set(total_reviews);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(%driver_id, %booking_id, rating, new_rating, "Review submitted");

    state.notifier.notify(
        user_id,
        NotificationKind::ReviewReceived,
        "New Review",
        format!("You received a {}-star review from a customer.", rating),
        "/driver/reviews",
    );

    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rating_becomes_average() {
        assert_eq!(running_average(0.0, 0, 4), 4.0);
    }

    #[test]
    fn test_running_average_matches_mean() {
        let ratings = [5, 3, 4, 4, 1];
        let mut average = 0.0;
        for (count, rating) in ratings.iter().enumerate() {
            average = running_average(average, count as i32, *rating);
        }

        let mean = ratings.iter().sum::<i32>() as f64 / ratings.len() as f64;
        assert!((average - mean).abs() < 1e-9);
    }

    #[test]
    fn test_review_validation() {
        assert!(validate_review(5, "Great driver").is_ok());
        assert!(validate_review(0, "").is_err());
        assert!(validate_review(6, "").is_err());
        assert!(validate_review(3, &"x".repeat(MAX_COMMENT_CHARS)).is_ok());
        assert!(validate_review(3, &"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }
}
