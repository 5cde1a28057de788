use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Sign a session token for `user`, valid for the configured number of hours
pub fn create_token(user: &user::Model, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired, please log in again".to_string())
        }
        _ => AppError::Unauthorized("Not authorized, invalid token".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expiration_hours: i64) -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: expiration_hours,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            admin_email: "admin@drivehire.com".to_string(),
            admin_password: "admin123".to_string(),
            maintenance_message: String::new(),
        }
    }

    fn driver_account() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "ravi@drivehire.com".to_string(),
            password_hash: String::new(),
            name: "Ravi".to_string(),
            phone: "9876543210".to_string(),
            city: "Pune".to_string(),
            role: UserRole::Driver,
            is_blocked: false,
            avatar: String::new(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_token_carries_identity_and_role() {
        let account = driver_account();
        let token = create_token(&account, &config(24)).unwrap();

        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, UserRole::Driver);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(&driver_account(), &config(24)).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_reported() {
        let token = create_token(&driver_account(), &config(-2)).unwrap();
        match verify_token(&token, "test-secret") {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("expired")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
