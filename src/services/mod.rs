pub mod availability;
pub mod booking;
pub mod documents;
pub mod messages;
pub mod notify;
pub mod payment;
pub mod pricing;
pub mod review;
