use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver;
use crate::entities::quick_message::{self, SenderRole};
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Canned line one party of a booking can send to the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub key: &'static str,
    pub text: &'static str,
    pub icon: &'static str,
}

const fn template(key: &'static str, text: &'static str, icon: &'static str) -> MessageTemplate {
    MessageTemplate { key, text, icon }
}

const CUSTOMER_TEMPLATES: &[MessageTemplate] = &[
    template("on_my_way", "🚶 I am on my way to the pickup location", "🚶"),
    template("at_pickup", "📍 I am at the pickup location", "📍"),
    template("running_late", "⏰ I am running a few minutes late", "⏰"),
    template("cancel_request", "❌ I need to cancel this booking", "❌"),
    template("change_pickup", "📋 I need to change the pickup location", "📋"),
    template("thank_you", "🙏 Thank you for the safe ride!", "🙏"),
    template("how_long", "⏳ How long until you arrive?", "⏳"),
    template("vehicle_details", "🚗 Sharing my vehicle details with you", "🚗"),
];

const DRIVER_TEMPLATES: &[MessageTemplate] = &[
    template("on_my_way", "🚗 I am on my way to pick you up", "🚗"),
    template("arrived", "✅ I have arrived at the pickup location", "✅"),
    template("running_late", "⏰ I am running a few minutes late", "⏰"),
    template("ride_started", "🏁 Ride has started", "🏁"),
    template("ride_ending", "🔜 We are about to reach the destination", "🔜"),
    template("ride_completed", "✅ Ride completed. Thank you!", "✅"),
    template("traffic_delay", "🚦 Stuck in traffic, will be delayed", "🚦"),
    template("call_request", "📞 Please call me for directions", "📞"),
];

/// Admins have no templates and therefore cannot send
pub fn templates_for(role: UserRole) -> &'static [MessageTemplate] {
    match role {
        UserRole::Customer => CUSTOMER_TEMPLATES,
        UserRole::Driver => DRIVER_TEMPLATES,
        UserRole::Admin => &[],
    }
}

pub fn find_template(role: UserRole, key: &str) -> AppResult<MessageTemplate> {
    templates_for(role)
        .iter()
        .find(|t| t.key == key)
        .copied()
        .ok_or_else(|| {
            AppError::BadRequest(
                "Invalid message. Only pre-defined messages are allowed.".to_string(),
            )
        })
}

/// Which side of the booking `user_id` is on, if any
pub fn participant(
    booking: &booking::Model,
    user_id: Uuid,
    driver_user_id: Option<Uuid>,
) -> Option<SenderRole> {
    if booking.customer_id == user_id {
        Some(SenderRole::Customer)
    } else if driver_user_id == Some(user_id) {
        Some(SenderRole::Driver)
    } else {
        None
    }
}

/// Messaging is open only while the hire is confirmed or running
pub fn ensure_can_send(booking: &booking::Model, sender: Option<SenderRole>) -> AppResult<SenderRole> {
    if !matches!(booking.status, BookingStatus::Confirmed | BookingStatus::Active) {
        return Err(AppError::BadRequest(
            "Messages are only available for confirmed or active bookings".to_string(),
        ));
    }
    sender.ok_or_else(|| AppError::Forbidden("You are not part of this booking".to_string()))
}

async fn load_booking(state: &AppState, booking_id: Uuid) -> AppResult<(booking::Model, Option<Uuid>)> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let driver_user_id = driver::Entity::find_by_id(booking.driver_id)
        .one(&state.db)
        .await?
        .map(|d| d.user_id);

    Ok((booking, driver_user_id))
}

pub async fn send(
    state: &AppState,
    user_id: Uuid,
    role: UserRole,
    booking_id: Uuid,
    message_key: &str,
) -> AppResult<quick_message::Model> {
    let (booking, driver_user_id) = load_booking(state, booking_id).await?;
    let sender_role = ensure_can_send(&booking, participant(&booking, user_id, driver_user_id))?;
    let template = find_template(role, message_key)?;

    let message = quick_message::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        sender_id: Set(user_id),
        sender_role: Set(sender_role),
        message_key: Set(template.key.to_string()),
        message_text: Set(template.text.to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::debug!(booking_id = %booking.id, %user_id, key = template.key, "Quick message sent");

    Ok(message)
}

/// Conversation of a booking, oldest first. Admins may read any booking.
pub async fn list(
    state: &AppState,
    user_id: Uuid,
    role: UserRole,
    booking_id: Uuid,
) -> AppResult<Vec<quick_message::Model>> {
    let (booking, driver_user_id) = load_booking(state, booking_id).await?;
    if role != UserRole::Admin && participant(&booking, user_id, driver_user_id).is_none() {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    let messages = quick_message::Entity::find()
        .filter(quick_message::Column::BookingId.eq(booking.id))
        .order_by_asc(quick_message::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::{BookingPaymentStatus, PaymentMethod};
    use crate::entities::pricing_rule::DurationType;
    use chrono::{Duration, TimeZone, Utc};

    fn booking_in(status: BookingStatus, customer_id: Uuid) -> booking::Model {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        booking::Model {
            id: Uuid::new_v4(),
            customer_id,
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            start_time: start.into(),
            end_time: (start + Duration::days(30)).into(),
            duration_type: DurationType::Monthly,
            status,
            total_price: 22_000,
            pickup_location: "MG Road".to_string(),
            notes: String::new(),
            payment_method: PaymentMethod::Cash,
            payment_status: BookingPaymentStatus::Unpaid,
            cancellation_reason: String::new(),
            cancelled_by: None,
            cancellation_penalty: 0,
            created_at: start.into(),
            updated_at: start.into(),
        }
    }

    #[test]
    fn test_each_role_gets_its_own_templates() {
        assert_eq!(templates_for(UserRole::Customer).len(), 8);
        assert_eq!(templates_for(UserRole::Driver).len(), 8);
        assert!(templates_for(UserRole::Admin).is_empty());

        let customer = find_template(UserRole::Customer, "on_my_way").unwrap();
        let driver = find_template(UserRole::Driver, "on_my_way").unwrap();
        assert_ne!(customer.text, driver.text);
    }

    #[test]
    fn test_unknown_or_foreign_keys_are_refused() {
        assert!(find_template(UserRole::Customer, "arrived").is_err());
        assert!(find_template(UserRole::Driver, "thank_you").is_err());
        match find_template(UserRole::Admin, "on_my_way") {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Invalid message. Only pre-defined messages are allowed.")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_participant_matches_driver_by_account() {
        let customer_id = Uuid::new_v4();
        let driver_user = Uuid::new_v4();
        let b = booking_in(BookingStatus::Confirmed, customer_id);

        assert_eq!(participant(&b, customer_id, Some(driver_user)), Some(SenderRole::Customer));
        assert_eq!(participant(&b, driver_user, Some(driver_user)), Some(SenderRole::Driver));
        // the driver profile id is not the account id
        assert_eq!(participant(&b, b.driver_id, Some(driver_user)), None);
    }

    #[test]
    fn test_messages_only_while_confirmed_or_active() {
        let customer_id = Uuid::new_v4();
        for status in [BookingStatus::Confirmed, BookingStatus::Active] {
            let b = booking_in(status, customer_id);
            assert!(ensure_can_send(&b, Some(SenderRole::Customer)).is_ok());
        }
        for status in [
            BookingStatus::Pending,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            let b = booking_in(status, customer_id);
            assert!(matches!(
                ensure_can_send(&b, Some(SenderRole::Customer)),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_outsiders_cannot_send() {
        let b = booking_in(BookingStatus::Active, Uuid::new_v4());
        match ensure_can_send(&b, None) {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "You are not part of this booking"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
