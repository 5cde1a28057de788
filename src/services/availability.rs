use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::error::AppResult;

/// Half-open intervals `[a_start, a_end)` and `[b_start, b_end)` intersect.
/// Touching endpoints do not.
pub fn windows_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// First open booking among `bookings` that intersects the window.
pub fn find_conflict<'a>(
    bookings: &'a [booking::Model],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Option<&'a booking::Model> {
    bookings.iter().find(|b| {
        Some(b.id) != exclude
            && BookingStatus::OPEN.contains(&b.status)
            && windows_overlap(
                b.start_time.with_timezone(&Utc),
                b.end_time.with_timezone(&Utc),
                start,
                end,
            )
    })
}

/// Open bookings of the driver that intersect `[start, end)`.
///
/// Callers that write afterwards must hold the driver row lock taken in the
/// same transaction, or two writers can both see an empty calendar.
pub async fn open_bookings_in<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<booking::Model>> {
    let open = booking::Entity::find()
        .filter(booking::Column::DriverId.eq(driver_id))
        .filter(booking::Column::Status.is_in(BookingStatus::OPEN))
        .filter(booking::Column::StartTime.lt(end))
        .filter(booking::Column::EndTime.gt(start))
        .all(db)
        .await?;

    Ok(open)
}

/// Log and report a clash between the requested window and the calendar
pub fn check_free(
    calendar: &[booking::Model],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> bool {
    match find_conflict(calendar, start, end, exclude) {
        Some(existing) => {
            tracing::debug!(
                driver_id = %existing.driver_id,
                conflicting_booking = %existing.id,
                "Driver window already taken"
            );
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::{BookingPaymentStatus, PaymentMethod};
    use crate::entities::pricing_rule::DurationType;
    use chrono::TimeZone;

    fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, month, day, 0, 0, 0).unwrap()
    }

    fn booking(start: DateTime<Utc>, end: DateTime<Utc>, status: BookingStatus) -> booking::Model {
        let now = Utc::now().into();
        booking::Model {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            start_time: start.into(),
            end_time: end.into(),
            duration_type: DurationType::Monthly,
            status,
            total_price: 25_000,
            pickup_location: "MG Road".to_string(),
            notes: String::new(),
            payment_method: PaymentMethod::Cash,
            payment_status: BookingPaymentStatus::Unpaid,
            cancellation_reason: String::new(),
            cancelled_by: None,
            cancellation_penalty: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overlapping_windows() {
        assert!(windows_overlap(10, 20, 15, 25));
        assert!(windows_overlap(15, 25, 10, 20));
        assert!(windows_overlap(10, 30, 15, 20));
    }

    #[test]
    fn test_touching_windows_do_not_overlap() {
        assert!(!windows_overlap(10, 20, 20, 30));
        assert!(!windows_overlap(20, 30, 10, 20));
        assert!(!windows_overlap(10, 20, 25, 30));
    }

    #[test]
    fn test_confirmed_booking_blocks_intersecting_request() {
        let existing = vec![booking(day(1, 1), day(2, 1), BookingStatus::Confirmed)];

        let conflict = find_conflict(&existing, day(1, 15), day(2, 15), None);
        assert_eq!(conflict.map(|b| b.id), Some(existing[0].id));

        assert!(find_conflict(&existing, day(2, 1), day(3, 3), None).is_none());
    }

    #[test]
    fn test_finished_bookings_never_block() {
        let existing = vec![
            booking(day(1, 1), day(2, 1), BookingStatus::Cancelled),
            booking(day(1, 1), day(2, 1), BookingStatus::Completed),
        ];

        assert!(find_conflict(&existing, day(1, 15), day(2, 15), None).is_none());
    }

    #[test]
    fn test_extension_ignores_its_own_booking() {
        let own = booking(day(1, 1), day(2, 1), BookingStatus::Active);
        let existing = vec![own.clone()];

        // The delta window starts where the booking ends
        assert!(find_conflict(&existing, day(2, 1), day(3, 3), Some(own.id)).is_none());
        // Even a window covering the original interval ignores the booking itself
        assert!(find_conflict(&existing, day(1, 1), day(3, 3), Some(own.id)).is_none());
    }

    #[test]
    fn test_extension_detects_next_booking() {
        let own = booking(day(1, 1), day(2, 1), BookingStatus::Active);
        let next = booking(day(2, 20), day(3, 25), BookingStatus::Pending);
        let existing = vec![own.clone(), next.clone()];

        let conflict = find_conflict(&existing, day(2, 1), day(3, 3), Some(own.id));
        assert_eq!(conflict.map(|b| b.id), Some(next.id));
    }
}
