use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::notification;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

const INBOX_SIZE: u64 = 50;

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub success: bool,
    pub notifications: Vec<notification::Model>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub success: bool,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub success: bool,
    pub updated: u64,
}

async fn unread_for(state: &AppState, user_id: Uuid) -> AppResult<u64> {
    let count = notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(&state.db)
        .await?;

    Ok(count)
}

/// Latest notifications plus the unread badge count
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<InboxResponse>> {
    let notifications = notification::Entity::find()
        .filter(notification::Column::UserId.eq(claims.sub))
        .order_by_desc(notification::Column::CreatedAt)
        .limit(INBOX_SIZE)
        .all(&state.db)
        .await?;
    let unread_count = unread_for(&state, claims.sub).await?;

    Ok(Json(InboxResponse {
        success: true,
        notifications,
        unread_count,
    }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread_count = unread_for(&state, claims.sub).await?;
    Ok(Json(UnreadCountResponse {
        success: true,
        unread_count,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MarkedReadResponse>> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::Id.eq(id))
        .filter(notification::Column::UserId.eq(claims.sub))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(MarkedReadResponse {
        success: true,
        updated: result.rows_affected,
    }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MarkedReadResponse>> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(claims.sub))
        .filter(notification::Column::IsRead.eq(false))
        .exec(&state.db)
        .await?;

    Ok(Json(MarkedReadResponse {
        success: true,
        updated: result.rows_affected,
    }))
}
