pub mod admin;
pub mod auth;
pub mod customer;
pub mod driver;
pub mod message;
pub mod notification;
pub mod system;

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::driver as driver_entity;
use crate::entities::{user, vehicle};
use crate::error::AppResult;

/// Optional free-text reason sent with rejections and cancellations
#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingStatusFilter {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: booking::Model,
}

impl BookingResponse {
    pub fn new(booking: booking::Model) -> Self {
        Self {
            success: true,
            booking,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Booking with the names the dashboards show next to it
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub customer_name: String,
    pub driver_name: String,
    pub vehicle: Option<vehicle::Model>,
}

pub(crate) async fn booking_views<C: ConnectionTrait>(
    db: &C,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingView>> {
    let driver_ids: Vec<Uuid> = bookings.iter().map(|b| b.driver_id).collect();
    let vehicle_ids: Vec<Uuid> = bookings.iter().map(|b| b.vehicle_id).collect();

    let drivers = driver_entity::Entity::find()
        .filter(driver_entity::Column::Id.is_in(driver_ids))
        .all(db)
        .await?;
    let driver_users: HashMap<Uuid, Uuid> = drivers.iter().map(|d| (d.id, d.user_id)).collect();

    let user_ids: Vec<Uuid> = bookings
        .iter()
        .map(|b| b.customer_id)
        .chain(drivers.iter().map(|d| d.user_id))
        .collect();
    let names: HashMap<Uuid, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let vehicles: HashMap<Uuid, vehicle::Model> = vehicle::Entity::find()
        .filter(vehicle::Column::Id.is_in(vehicle_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let views = bookings
        .into_iter()
        .map(|booking| {
            let driver_name = driver_users
                .get(&booking.driver_id)
                .and_then(|user_id| names.get(user_id))
                .cloned()
                .unwrap_or_default();
            let customer_name = names.get(&booking.customer_id).cloned().unwrap_or_default();
            let vehicle = vehicles.get(&booking.vehicle_id).cloned();

            BookingView {
                booking,
                customer_name,
                driver_name,
                vehicle,
            }
        })
        .collect();

    Ok(views)
}
