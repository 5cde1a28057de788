use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, auth, customer, driver, message, notification, system};
use crate::middleware::auth::{auth_middleware, require_admin, require_customer, require_driver};
use crate::middleware::maintenance::maintenance_guard;
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let customer_governor = create_role_governor(RateLimitedRole::Customer);
    let public_governor = create_public_governor();

    // Public auth routes, limited per IP
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(public_governor);

    let system_routes = Router::new()
        .route("/health", get(system::health))
        .route("/maintenance-status", get(system::maintenance_status));

    // Any authenticated role
    let account_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", put(auth::change_password))
        .route("/drivers/{id}/public", get(driver::public_profile))
        .route("/notifications", get(notification::list))
        .route("/notifications/unread-count", get(notification::unread_count))
        .route("/notifications/read-all", put(notification::mark_all_read))
        .route("/notifications/{id}/read", put(notification::mark_read))
        .route("/messages/templates", get(message::templates))
        .route("/messages/{booking_id}", get(message::list).post(message::send))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Customer routes (requires auth + customer role)
    // Rate limit: 100 requests per minute per user
    let customer_routes = Router::new()
        .route("/profile", get(customer::get_profile).put(customer::update_profile))
        .route("/favorites", get(customer::list_favorites))
        .route("/favorites/{driver_id}", post(customer::toggle_favorite))
        .route("/vehicles", get(customer::list_vehicles).post(customer::add_vehicle))
        .route(
            "/vehicles/{id}",
            put(customer::update_vehicle).delete(customer::delete_vehicle),
        )
        .route("/search-drivers", get(customer::search_drivers))
        .route("/price-estimate", get(customer::price_estimate))
        .route("/bookings", get(customer::my_bookings).post(customer::create_booking))
        .route("/bookings/{id}/cancel", put(customer::cancel_booking))
        .route("/bookings/{id}/extend", put(customer::extend_booking))
        .route("/bookings/{id}/pay", post(customer::pay_booking))
        .route("/bookings/{id}/confirm-payment", post(customer::confirm_payment))
        .route("/reviews", post(customer::add_review))
        .route("/invoices", get(customer::invoices))
        .layer(customer_governor)
        .layer(middleware::from_fn(require_customer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    // Rate limit: 250 requests per minute per user
    let driver_routes = Router::new()
        .route("/profile", get(driver::get_profile).put(driver::update_profile))
        .route("/documents", post(driver::upload_documents))
        .route("/toggle-online", put(driver::toggle_online))
        .route("/jobs", get(driver::my_jobs))
        .route("/jobs/{id}/accept", put(driver::accept_job))
        .route("/jobs/{id}/reject", put(driver::reject_job))
        .route("/jobs/{id}/cancel", put(driver::cancel_job))
        .route("/jobs/{id}/complete", put(driver::complete_job))
        .route("/earnings", get(driver::earnings))
        .route("/reviews", get(driver::my_reviews))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role), global limiter only
    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/drivers", get(admin::list_drivers))
        .route("/drivers/{id}/approve", put(admin::approve_driver))
        .route("/drivers/{id}/reject", put(admin::reject_driver))
        .route("/drivers/{id}/documents", get(admin::driver_documents))
        .route("/drivers/{id}/verify", put(admin::verify_documents))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/block", put(admin::toggle_block))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}/cancel", put(admin::cancel_booking))
        .route("/pricing", get(admin::list_pricing).post(admin::create_pricing))
        .route(
            "/pricing/{id}",
            put(admin::update_pricing).delete(admin::delete_pricing),
        )
        .route("/payments", get(admin::list_payments))
        .route(
            "/maintenance",
            get(admin::get_maintenance).put(admin::set_maintenance),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", system_routes.merge(account_routes))
        .nest("/api/customers", customer_routes)
        .nest("/api/drivers", driver_routes)
        .nest("/api/admin", admin_routes)
        .layer(middleware::from_fn_with_state(
            state.maintenance.clone(),
            maintenance_guard,
        ))
        .with_state(state)
}
