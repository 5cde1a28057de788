use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const RESET_SECRET_LEN: usize = 40;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// `Ok(false)` on a mismatch; an unreadable stored hash is an internal error
pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// One-time reset token `<user id>.<secret>` and the secret alone, which is
/// what gets hashed and stored
pub fn generate_reset_token(user_id: Uuid) -> (String, String) {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_SECRET_LEN)
        .map(char::from)
        .collect();

    (format!("{}.{}", user_id, secret), secret)
}

pub fn split_reset_token(token: &str) -> Option<(Uuid, &str)> {
    let (user_id, secret) = token.trim().split_once('.')?;
    let user_id = Uuid::parse_str(user_id).ok()?;

    (!secret.is_empty()).then_some((user_id, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_splits_back_into_parts() {
        let user_id = Uuid::new_v4();
        let (token, secret) = generate_reset_token(user_id);

        assert_eq!(secret.len(), RESET_SECRET_LEN);
        assert_eq!(split_reset_token(&token), Some((user_id, secret.as_str())));
    }

    #[test]
    fn test_malformed_reset_tokens() {
        assert_eq!(split_reset_token("no-dot-here"), None);
        assert_eq!(split_reset_token("not-a-uuid.secret"), None);
        assert_eq!(split_reset_token(&format!("{}.", Uuid::new_v4())), None);
    }

    #[test]
    fn test_hash_verifies_only_the_original() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
