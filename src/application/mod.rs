// Application layer - Use cases and collaborator seams
pub mod dashboard_client;
pub mod monitor_service;
pub mod reading_source;
