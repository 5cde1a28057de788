use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::driver::{self, ApprovalStatus, DocumentStatus, Languages, VehicleTypes};
use crate::entities::user::{self, UserRole};
use crate::entities::vehicle::VehicleType;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{create_token, Claims};
use crate::utils::password::{
    generate_reset_token, hash_password, split_reset_token, verify_password,
};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_EXPERIENCE_YEARS: i32 = 50;
const RESET_TOKEN_MINUTES: i64 = 30;

/// Roles open to self-registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupRole {
    #[default]
    Customer,
    Driver,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub role: SignupRole,
    // Driver profile
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub experience: i32,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub vehicle_types: Vec<VehicleType>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordChangedResponse {
    pub success: bool,
    pub token: String,
    pub message: &'static str,
}

/// Reset tokens are handed back directly; delivering them is up to the caller
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub success: bool,
    pub message: &'static str,
    pub reset_token: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub avatar: String,
    pub role: UserRole,
}

impl From<user::Model> for UserInfo {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            city: user.city,
            avatar: user.avatar,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<driver::Model>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if payload.role == SignupRole::Driver {
        validate_experience(payload.experience)?;
    }
    Ok(())
}

pub(crate) fn validate_experience(years: i32) -> AppResult<()> {
    if !(0..=MAX_EXPERIENCE_YEARS).contains(&years) {
        return Err(AppError::BadRequest(format!(
            "Experience must be between 0 and {} years",
            MAX_EXPERIENCE_YEARS
        )));
    }
    Ok(())
}

fn validate_password_change(payload: &ChangePasswordRequest) -> AppResult<()> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Current and new password are required".to_string(),
        ));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn auth_response(state: &AppState, user: user::Model) -> AppResult<Json<AuthResponse>> {
    let token = create_token(&user, &state.config)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

/// Register a customer or driver account. Drivers also get an empty,
/// unapproved profile.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    validate_registration(&payload)?;
    let email = normalize_email(&payload.email);

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let role = match payload.role {
        SignupRole::Customer => UserRole::Customer,
        SignupRole::Driver => UserRole::Driver,
    };

    let txn = state.db.begin().await?;

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        name: Set(payload.name.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        role: Set(role.clone()),
        is_blocked: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if role == UserRole::Driver {
        let vehicle_types = if payload.vehicle_types.is_empty() {
            vec![VehicleType::Car]
        } else {
            payload.vehicle_types
        };

        driver::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            license_number: Set(payload.license_number.trim().to_string()),
            license_image: Set(String::new()),
            id_proof_image: Set(String::new()),
            aadhaar_number: Set(String::new()),
            aadhaar_image: Set(String::new()),
            document_status: Set(DocumentStatus::NotUploaded),
            verification_remarks: Set(String::new()),
            verified_at: Set(None),
            experience: Set(payload.experience),
            languages: Set(Languages(payload.languages)),
            vehicle_types: Set(VehicleTypes(vehicle_types)),
            city: Set(user.city.clone()),
            is_approved: Set(ApprovalStatus::Pending),
            is_online: Set(false),
            rating: Set(0.0),
            total_reviews: Set(0),
            total_earnings: Set(0),
            completed_jobs: Set(0),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "User registered");

    auth_response(&state, user)
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::debug!(%email, "Failed login attempt");
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    if user.is_blocked {
        return Err(AppError::Forbidden(
            "Account is blocked. Contact admin.".to_string(),
        ));
    }

    auth_response(&state, user)
}

/// Current account, with the driver profile for drivers
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MeResponse>> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let driver = if user.role == UserRole::Driver {
        driver::Entity::find()
            .filter(driver::Column::UserId.eq(user.id))
            .one(&state.db)
            .await?
    } else {
        None
    };

    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
        driver,
    }))
}

/// Change the password of the logged-in account and issue a fresh token
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<PasswordChangedResponse>> {
    validate_password_change(&payload)?;

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    let user = active.update(&state.db).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(PasswordChangedResponse {
        success: true,
        token: create_token(&user, &state.config)?,
        message: "Password changed successfully",
    }))
}

/// Issue a short-lived reset token for the account
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ResetTokenResponse>> {
    let email = normalize_email(&payload.email);

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No account with that email".to_string()))?;

    let (reset_token, secret) = generate_reset_token(user.id);
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);

    let mut active: user::ActiveModel = user.into();
    active.reset_token_hash = Set(Some(hash_password(&secret)?));
    active.reset_token_expires_at = Set(Some(expires_at.into()));
    let user = active.update(&state.db).await?;

    tracing::info!(user_id = %user.id, "Password reset requested");

    Ok(Json(ResetTokenResponse {
        success: true,
        message: "Password reset token generated",
        reset_token,
        expires_in_minutes: RESET_TOKEN_MINUTES,
    }))
}

/// Set a new password with a reset token. The token works once.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<PasswordChangedResponse>> {
    let invalid = || AppError::BadRequest("Invalid or expired token".to_string());

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let (user_id, secret) = split_reset_token(&payload.token).ok_or_else(invalid)?;

    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(invalid)?;

    let live = user
        .reset_token_expires_at
        .is_some_and(|expires| expires.with_timezone(&Utc) > Utc::now());
    let stored = user.reset_token_hash.clone().filter(|_| live).ok_or_else(invalid)?;
    if !verify_password(secret, &stored)? {
        return Err(invalid());
    }

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.reset_token_hash = Set(None);
    active.reset_token_expires_at = Set(None);
    let user = active.update(&state.db).await?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(Json(PasswordChangedResponse {
        success: true,
        token: create_token(&user, &state.config)?,
        message: "Password reset successful",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: SignupRole, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: " Asha@Example.com ".to_string(),
            password: password.to_string(),
            name: "Asha".to_string(),
            phone: String::new(),
            city: "Mumbai".to_string(),
            role,
            license_number: String::new(),
            experience: 4,
            languages: vec![],
            vehicle_types: vec![],
        }
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(normalize_email(" Asha@Example.com "), "asha@example.com");
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&request(SignupRole::Customer, "secret1")).is_ok());
        assert!(validate_registration(&request(SignupRole::Customer, "short")).is_err());

        let mut driver = request(SignupRole::Driver, "secret1");
        driver.experience = -1;
        assert!(validate_registration(&driver).is_err());
    }

    #[test]
    fn test_experience_is_bounded_at_fifty_years() {
        let mut driver = request(SignupRole::Driver, "secret1");
        driver.experience = MAX_EXPERIENCE_YEARS;
        assert!(validate_registration(&driver).is_ok());

        driver.experience = MAX_EXPERIENCE_YEARS + 1;
        match validate_registration(&driver) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Experience must be between 0 and 50 years")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_password_change_validation() {
        let change = |current: &str, new: &str| ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };

        assert!(validate_password_change(&change("secret1", "secret2")).is_ok());

        match validate_password_change(&change("", "secret2")) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Current and new password are required")
            }
            other => panic!("unexpected {:?}", other),
        }

        match validate_password_change(&change("secret1", "abc")) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "New password must be at least 6 characters")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_admin_cannot_self_register() {
        let parsed = serde_json::from_str::<SignupRole>("\"admin\"");
        assert!(parsed.is_err());
        assert_eq!(
            serde_json::from_str::<SignupRole>("\"driver\"").unwrap(),
            SignupRole::Driver
        );
    }
}
