pub mod codec;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod permission;
pub mod recording_result;
pub mod state;
