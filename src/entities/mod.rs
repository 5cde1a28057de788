pub mod booking;
pub mod driver;
pub mod favorite;
pub mod notification;
pub mod payment;
pub mod pricing_rule;
pub mod quick_message;
pub mod review;
pub mod user;
pub mod vehicle;
