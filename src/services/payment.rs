//! Simulated payment gateway and the payment side of booking transitions.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingPaymentStatus, PaymentMethod};
use crate::entities::driver;
use crate::entities::notification::NotificationKind;
use crate::entities::payment::{self, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::AppState;

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

pub fn generate_transaction_id(now: DateTime<Utc>) -> String {
    format!("TXN{}{}", now.timestamp_millis(), random_suffix())
}

pub fn generate_order_id(now: DateTime<Utc>) -> String {
    format!("ORD_{}{}", now.timestamp_millis(), random_suffix())
}

/// Amount returned to the customer after the penalty is kept. Never negative.
pub fn refund_amount(amount: i64, penalty: i64) -> i64 {
    (amount - penalty).max(0)
}

/// Simulated gateway order handed back to the client
#[derive(Debug, Serialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: i64,
    pub currency: &'static str,
    pub method: PaymentMethod,
    pub payment_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<&'static str>,
    pub status: &'static str,
}

/// The booking's completed payment, if it has one
pub async fn completed_payment<C: ConnectionTrait>(
    db: &C,
    booking_id: Uuid,
) -> AppResult<Option<payment::Model>> {
    let paid = payment::Entity::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Completed))
        .order_by_desc(payment::Column::CreatedAt)
        .one(db)
        .await?;

    Ok(paid)
}

/// Refund a completed payment, keeping `penalty`
pub fn refund(paid: payment::Model, penalty: i64, now: DateTime<Utc>) -> payment::ActiveModel {
    if penalty > paid.amount {
        tracing::warn!(
            booking_id = %paid.booking_id,
            amount = paid.amount,
            penalty,
            "Penalty exceeds paid amount, refunding nothing"
        );
    }

    let refund = refund_amount(paid.amount, penalty);
    let mut active: payment::ActiveModel = paid.into();
    active.status = Set(PaymentStatus::Refunded);
    active.refund_amount = Set(refund);
    active.updated_at = Set(now.into());
    active
}

/// Completed payment recorded for a job finished without one.
/// Covers cash bookings, which are settled on completion.
pub fn settlement(booking: &booking::Model, now: DateTime<Utc>) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        customer_id: Set(booking.customer_id),
        amount: Set(booking.total_price),
        method: Set(booking.payment_method),
        status: Set(PaymentStatus::Completed),
        transaction_id: Set(generate_transaction_id(now)),
        refund_amount: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

/// A booking can only take a new payment while it is open and unpaid
pub fn ensure_payable(booking: &booking::Model) -> AppResult<()> {
    if booking.payment_status == BookingPaymentStatus::Paid {
        return Err(AppError::BadRequest("Payment already completed".to_string()));
    }

    if booking.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Cannot pay for a {} booking",
            booking.status.as_str()
        )));
    }

    Ok(())
}

/// Only a pending payment of a payable booking can be confirmed
pub fn ensure_confirmable(booking: &booking::Model, payment: &payment::Model) -> AppResult<()> {
    ensure_payable(booking)?;

    if payment.status != PaymentStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Payment is already {}",
            payment.status.as_str()
        )));
    }

    Ok(())
}

async fn owned_booking<C: ConnectionTrait>(
    db: &C,
    booking_id: Uuid,
    customer_id: Uuid,
) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(booking_id)
        .filter(booking::Column::CustomerId.eq(customer_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// Load the customer's booking under its driver's row lock, the same lock
/// the booking transitions take, so a payment cannot race a cancellation.
async fn lock_owned_booking<C: ConnectionTrait>(
    db: &C,
    booking_id: Uuid,
    customer_id: Uuid,
) -> AppResult<booking::Model> {
    let peeked = owned_booking(db, booking_id, customer_id).await?;

    driver::Entity::find_by_id(peeked.driver_id)
        .lock_exclusive()
        .one(db)
        .await?;

    owned_booking(db, booking_id, customer_id).await
}

/// Start an online payment: reuse the booking's pending payment or open a new one
pub async fn initiate(
    state: &AppState,
    customer_id: Uuid,
    booking_id: Uuid,
    method: PaymentMethod,
) -> AppResult<(GatewayOrder, booking::Model)> {
    if !method.is_online() {
        return Err(AppError::BadRequest(
            "Choose a valid online method: upi, card, netbanking, or wallet".to_string(),
        ));
    }

    let txn = state.db.begin().await?;

    let booking = lock_owned_booking(&txn, booking_id, customer_id).await?;
    ensure_payable(&booking)?;

    let mut active: booking::ActiveModel = booking.into();
    active.payment_method = Set(method);
    active.updated_at = Set(Utc::now().into());
    let booking = active.update(&txn).await?;

    let pending = payment::Entity::find()
        .filter(payment::Column::BookingId.eq(booking.id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .one(&txn)
        .await?;

    let now = Utc::now();
    let payment = match pending {
        Some(existing) => {
            let mut active: payment::ActiveModel = existing.into();
            active.method = Set(method);
            active.amount = Set(booking.total_price);
            active.updated_at = Set(now.into());
            active.update(&txn).await?
        }
        None => {
            payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                booking_id: Set(booking.id),
                customer_id: Set(customer_id),
                amount: Set(booking.total_price),
                method: Set(method),
                status: Set(PaymentStatus::Pending),
                transaction_id: Set(generate_transaction_id(now)),
                refund_amount: Set(0),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, payment_id = %payment.id, ?method, "Payment initiated");

    let order = GatewayOrder {
        order_id: generate_order_id(now),
        amount: booking.total_price,
        currency: "INR",
        method,
        payment_id: payment.id,
        upi_id: (method == PaymentMethod::Upi).then_some("drivehire@upi"),
        status: "created",
    };

    Ok((order, booking))
}

/// Gateway callback: mark the payment completed and the booking paid
pub async fn confirm(
    state: &AppState,
    customer_id: Uuid,
    booking_id: Uuid,
    payment_id: Uuid,
    gateway_reference: Option<String>,
) -> AppResult<(booking::Model, payment::Model)> {
    let txn = state.db.begin().await?;

    let booking = lock_owned_booking(&txn, booking_id, customer_id).await?;

    let payment = payment::Entity::find_by_id(payment_id)
        .filter(payment::Column::BookingId.eq(booking.id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment record not found".to_string()))?;

    ensure_confirmable(&booking, &payment)?;

    let now = Utc::now();
    let transaction_id = gateway_reference
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| payment.transaction_id.clone());

    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Completed);
    active.transaction_id = Set(transaction_id);
    active.updated_at = Set(now.into());
    let payment = active.update(&txn).await?;

    let mut active: booking::ActiveModel = booking.into();
    active.payment_status = Set(BookingPaymentStatus::Paid);
    active.updated_at = Set(now.into());
    let booking = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, payment_id = %payment.id, "Payment confirmed");

    if let Some(driver) = driver::Entity::find_by_id(booking.driver_id)
        .one(&state.db)
        .await?
    {
        state.notifier.notify(
            driver.user_id,
            NotificationKind::PaymentReceived,
            "Payment Received",
            format!(
                "Online payment of ₹{} received for your booking.",
                booking.total_price
            ),
            "/driver/jobs",
        );
    }

    Ok((booking, payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::BookingStatus;
    use crate::entities::pricing_rule::DurationType;
    use chrono::TimeZone;

    fn booking(status: BookingStatus, payment_status: BookingPaymentStatus) -> booking::Model {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap().into();
        booking::Model {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            start_time: now,
            end_time: now,
            duration_type: DurationType::Monthly,
            status,
            total_price: 22_000,
            pickup_location: "MG Road".to_string(),
            notes: String::new(),
            payment_method: PaymentMethod::Upi,
            payment_status,
            cancellation_reason: String::new(),
            cancelled_by: None,
            cancellation_penalty: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_for(booking: &booking::Model, status: PaymentStatus) -> payment::Model {
        let now = Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap().into();
        payment::Model {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            customer_id: booking.customer_id,
            amount: booking.total_price,
            method: booking.payment_method,
            status,
            transaction_id: "TXN1ABCDEF".to_string(),
            refund_amount: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn bad_request(result: AppResult<()>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_open_unpaid_bookings_are_payable() {
        for status in BookingStatus::OPEN {
            assert!(ensure_payable(&booking(status, BookingPaymentStatus::Unpaid)).is_ok());
        }
    }

    #[test]
    fn test_finished_bookings_cannot_take_payment() {
        let cancelled = booking(BookingStatus::Cancelled, BookingPaymentStatus::Refunded);
        assert_eq!(bad_request(ensure_payable(&cancelled)), "Cannot pay for a cancelled booking");

        let cancelled = booking(BookingStatus::Cancelled, BookingPaymentStatus::Unpaid);
        assert_eq!(bad_request(ensure_payable(&cancelled)), "Cannot pay for a cancelled booking");

        let paid = booking(BookingStatus::Confirmed, BookingPaymentStatus::Paid);
        assert_eq!(bad_request(ensure_payable(&paid)), "Payment already completed");
    }

    #[test]
    fn test_only_pending_payments_confirm() {
        let open = booking(BookingStatus::Confirmed, BookingPaymentStatus::Unpaid);
        assert!(ensure_confirmable(&open, &payment_for(&open, PaymentStatus::Pending)).is_ok());

        for status in [PaymentStatus::Completed, PaymentStatus::Refunded, PaymentStatus::Failed] {
            let msg = bad_request(ensure_confirmable(&open, &payment_for(&open, status)));
            assert_eq!(msg, format!("Payment is already {}", status.as_str()));
        }
    }

    #[test]
    fn test_refunded_payment_stays_refunded_after_cancel() {
        // Pay, cancel with a refund, then try to confirm the same payment again
        let cancelled = booking(BookingStatus::Cancelled, BookingPaymentStatus::Refunded);
        let mut refunded = payment_for(&cancelled, PaymentStatus::Refunded);
        refunded.refund_amount = 19_800;

        assert!(ensure_confirmable(&cancelled, &refunded).is_err());

        let pending = payment_for(&cancelled, PaymentStatus::Pending);
        assert_eq!(
            bad_request(ensure_confirmable(&cancelled, &pending)),
            "Cannot pay for a cancelled booking"
        );
    }

    #[test]
    fn test_refund_flips_status_and_keeps_penalty() {
        let cancelled = booking(BookingStatus::Confirmed, BookingPaymentStatus::Paid);
        let paid = payment_for(&cancelled, PaymentStatus::Completed);
        let now = Utc.with_ymd_and_hms(2030, 1, 5, 0, 0, 0).unwrap();

        let refunded = refund(paid.clone(), 2_200, now);
        assert_eq!(refunded.id.clone().unwrap(), paid.id);
        assert_eq!(refunded.status.clone().unwrap(), PaymentStatus::Refunded);
        assert_eq!(refunded.refund_amount.clone().unwrap(), 19_800);
        assert_eq!(refunded.amount.clone().unwrap(), 22_000);

        let nothing_back = refund(paid, 30_000, now);
        assert_eq!(nothing_back.refund_amount.clone().unwrap(), 0);
    }

    #[test]
    fn test_settlement_records_full_price() {
        let finished = booking(BookingStatus::Active, BookingPaymentStatus::Unpaid);
        let now = Utc.with_ymd_and_hms(2030, 2, 1, 0, 0, 0).unwrap();

        let record = settlement(&finished, now);
        assert_eq!(record.booking_id.clone().unwrap(), finished.id);
        assert_eq!(record.customer_id.clone().unwrap(), finished.customer_id);
        assert_eq!(record.amount.clone().unwrap(), 22_000);
        assert_eq!(record.status.clone().unwrap(), PaymentStatus::Completed);
        assert_eq!(record.method.clone().unwrap(), PaymentMethod::Upi);
        assert!(record.transaction_id.clone().unwrap().starts_with("TXN"));
    }

    #[test]
    fn test_refund_keeps_penalty() {
        assert_eq!(refund_amount(22_000, 2_200), 19_800);
        assert_eq!(refund_amount(22_000, 0), 22_000);
    }

    #[test]
    fn test_refund_is_floored_at_zero() {
        assert_eq!(refund_amount(1_000, 2_200), 0);
    }

    #[test]
    fn test_generated_ids_carry_timestamp_and_suffix() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let millis = now.timestamp_millis().to_string();

        let txn = generate_transaction_id(now);
        assert!(txn.starts_with(&format!("TXN{}", millis)));
        assert_eq!(txn.len(), 3 + millis.len() + 6);

        let suffix = &txn[3 + millis.len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let order = generate_order_id(now);
        assert!(order.starts_with(&format!("ORD_{}", millis)));
    }

    #[test]
    fn test_gateway_order_hides_upi_id_for_cards() {
        let order = GatewayOrder {
            order_id: "ORD_1".to_string(),
            amount: 22_000,
            currency: "INR",
            method: PaymentMethod::Card,
            payment_id: Uuid::nil(),
            upi_id: None,
            status: "created",
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["method"], "card");
        assert!(json.get("upi_id").is_none());
    }
}
