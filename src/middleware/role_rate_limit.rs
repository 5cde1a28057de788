use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Keys the limiter on the authenticated user rather than the client IP
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // Set by auth_middleware, which must run first
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(claims.sub)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Roles that get a per-user limiter. Admin routes only sit behind the global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedRole {
    Customer,
    Driver,
}

impl RateLimitedRole {
    /// (milliseconds per replenished token, burst)
    fn quota(self) -> (u64, u32) {
        match self {
            // Drivers poll jobs and notifications: 250 per minute
            RateLimitedRole::Driver => (240, 250),
            // 100 per minute
            RateLimitedRole::Customer => (600, 100),
        }
    }
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = role.quota();

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("governor period and burst must be non-zero"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use axum::body::Body;

    #[test]
    fn test_extracts_user_id_from_claims() {
        let user_id = Uuid::new_v4();
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(Claims {
            sub: user_id,
            email: "a@b.com".to_string(),
            role: UserRole::Customer,
            exp: 0,
            iat: 0,
        });

        assert_eq!(UserIdExtractor.extract(&request).unwrap(), user_id);
    }

    #[test]
    fn test_missing_claims_cannot_be_keyed() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(matches!(
            UserIdExtractor.extract(&request),
            Err(GovernorError::UnableToExtractKey)
        ));
    }

    #[test]
    fn test_drivers_get_the_larger_quota() {
        let (driver_ms, driver_burst) = RateLimitedRole::Driver.quota();
        let (customer_ms, customer_burst) = RateLimitedRole::Customer.quota();
        assert!(driver_ms < customer_ms);
        assert!(driver_burst > customer_burst);
    }
}
