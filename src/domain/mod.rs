// Domain layer - Readings, classification and the dashboard view model
pub mod dashboard;
pub mod events;
pub mod notification;
pub mod reading;
pub mod rolling_buffer;
