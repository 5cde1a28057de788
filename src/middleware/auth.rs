use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sea_orm::EntityTrait;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Extract and validate JWT token from Authorization header.
/// Blocked or deleted accounts are turned away even with a valid token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;

    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if account.is_blocked {
        return Err(AppError::Forbidden(
            "Account is blocked. Contact admin.".to_string(),
        ));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn ensure_role(request: &Request, role: UserRole, denied: &str) -> AppResult<()> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if claims.role != role {
        return Err(AppError::Forbidden(denied.to_string()));
    }

    Ok(())
}

/// Require admin role
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    ensure_role(&request, UserRole::Admin, "Admin access required")?;
    Ok(next.run(request).await)
}

/// Require driver role
pub async fn require_driver(request: Request, next: Next) -> AppResult<Response> {
    ensure_role(&request, UserRole::Driver, "Driver access required")?;
    Ok(next.run(request).await)
}

/// Require customer role
pub async fn require_customer(request: Request, next: Next) -> AppResult<Response> {
    ensure_role(&request, UserRole::Customer, "Customer access required")?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::{from_fn, Next},
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn inject(role: UserRole, mut request: Request, next: Next) -> Response {
        request.extensions_mut().insert(Claims {
            sub: Uuid::new_v4(),
            email: "someone@drivehire.com".to_string(),
            role,
            exp: 0,
            iat: 0,
        });
        next.run(request).await
    }

    fn admin_only(role: Option<UserRole>) -> Router {
        let router = Router::new()
            .route("/", get(|| async { "ok".into_response() }))
            .layer(from_fn(require_admin));

        match role {
            Some(role) => router.layer(from_fn(move |req: Request, next: Next| {
                inject(role.clone(), req, next)
            })),
            None => router,
        }
    }

    async fn status_for(role: Option<UserRole>) -> StatusCode {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        admin_only(role).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_admin_passes() {
        assert_eq!(status_for(Some(UserRole::Admin)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_roles_are_forbidden() {
        assert_eq!(status_for(Some(UserRole::Customer)).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(Some(UserRole::Driver)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_claims_are_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }
}
