// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod email_notifier;
pub mod event_stream;
pub mod gateway_source;
pub mod http_response;
pub mod simulated_source;
