pub mod capture_delegate;
pub mod permission_provider;
pub mod recorder_backend;
pub mod recorder_listener;
