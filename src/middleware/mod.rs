pub mod auth;
pub mod maintenance;
pub mod rate_limit;
pub mod role_rate_limit;
