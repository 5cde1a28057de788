use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::quick_message;
use crate::error::AppResult;
use crate::services::messages::{self, MessageTemplate};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message_key: String,
}

#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub success: bool,
    pub templates: &'static [MessageTemplate],
}

#[derive(Debug, Serialize)]
pub struct SentMessageResponse {
    pub success: bool,
    pub message: quick_message::Model,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub messages: Vec<quick_message::Model>,
}

pub async fn templates(Extension(claims): Extension<Claims>) -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        success: true,
        templates: messages::templates_for(claims.role),
    })
}

pub async fn send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<SentMessageResponse>)> {
    let message = messages::send(
        &state,
        claims.sub,
        claims.role,
        booking_id,
        payload.message_key.trim(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            success: true,
            message,
        }),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ConversationResponse>> {
    let messages = messages::list(&state, claims.sub, claims.role, booking_id).await?;

    Ok(Json(ConversationResponse {
        success: true,
        messages,
    }))
}
